// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Types not specific to [packets][crate::packet] or the [decoder][crate::decoder]

pub mod branch;
pub mod stack;
