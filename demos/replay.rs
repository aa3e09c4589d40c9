// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Replay of packets from a TOML file
//!
//!     Usage: replay [OPTIONS] <binary> <packets>
//!
//! This program replays the execution of a program provided either as an ELF
//! file or as a raw memory image loaded at a given base address. Packets are
//! supplied as a TOML file holding an array of tables named `packet`, each
//! being either an instruction trace packet (distinguished by its `format`) or
//! a support message. Encoder capabilities may be supplied in the form of a
//! TOML file.
//!
//! The program prints a single line for every retired instruction to stdout,
//! followed by statistics of the decoder's instruction cache. If run with the
//! `--debug` flag or the environment variable `DEBUG` set to `1`, every packet
//! processed is logged to stderr.

use std::path::PathBuf;

use riscv_te_replay::binary::{self, Binary};
use riscv_te_replay::instruction::base;
use riscv_te_replay::packet::{InstructionTrace, Support};
use riscv_te_replay::{config, decoder};

/// A single entry of the packet file
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum Message {
    Packet(InstructionTrace),
    Support(Support),
}

#[derive(Debug, serde::Deserialize)]
struct Packets {
    #[serde(default)]
    packet: Vec<Message>,
}

fn main() {
    let matches = clap::Command::new("Replay")
        .arg(
            clap::arg!(<binary> "Path to the ELF file or memory image")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(<packets> "Path to the packet file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(-c --capabilities <FILE> "Encoder capabilities")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(-b --base <ADDRESS> "Load address of a memory image")
                .value_parser(parse_address),
        )
        .arg(clap::arg!(--rv64 "Decode RV64 instructions for memory images"))
        .arg(
            clap::arg!(-d --debug "Enable additional debug output")
                .env("DEBUG")
                .action(clap::ArgAction::SetTrue)
                .value_parser(clap::builder::FalseyValueParser::new()),
        )
        .get_matches();

    let level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .expect("Could not initialize logger");

    let capabilities: config::Capabilities = matches
        .get_one::<PathBuf>("capabilities")
        .map(|p| {
            let caps = std::fs::read_to_string(p).expect("Could not load capabilities");
            toml::from_str(caps.as_ref()).expect("Could not parse capabilities")
        })
        .unwrap_or_default();
    log::debug!("Capabilities: {capabilities:?}");

    let packets = matches
        .get_one::<PathBuf>("packets")
        .expect("No packet file specified");
    let packets = std::fs::read_to_string(packets).expect("Could not load packets");
    let packets: Packets = toml::from_str(packets.as_ref()).expect("Could not parse packets");

    let binary = matches
        .get_one::<PathBuf>("binary")
        .expect("No binary specified");
    let data = std::fs::read(binary).expect("Could not load binary");

    if data.starts_with(b"\x7fELF") {
        let elf = elf::ElfBytes::<elf::endian::LittleEndian>::minimal_parse(data.as_ref())
            .expect("Could not parse ELF file");
        let elf = binary::elf::Elf::new(elf).expect("Could not construct binary from ELF file");
        let isa = elf.base_set();
        replay(elf, isa, &capabilities, &packets.packet);
    } else {
        let base = matches.get_one::<u64>("base").copied().unwrap_or(0);
        let isa = if matches.get_flag("rv64") {
            base::Set::Rv64I
        } else {
            base::Set::Rv32I
        };
        replay(
            binary::from_segment(data.as_slice()).with_offset(base),
            isa,
            &capabilities,
            &packets.packet,
        );
    }
}

/// Replay all `messages` over the given `binary`
fn replay<B>(binary: B, isa: base::Set, capabilities: &config::Capabilities, messages: &[Message])
where
    B: Binary,
    B::Error: std::error::Error + 'static,
{
    let mut decoder = decoder::builder()
        .with_capabilities(capabilities)
        .with_binary(binary)
        .with_isa(isa)
        .with_sink(decoder::from_fn(|_, pc, insn| println!("{pc:0x}, {insn}")))
        .build();

    for message in messages {
        let res = match message {
            Message::Packet(packet) => decoder.process_te_inst(packet),
            Message::Support(support) => decoder.process_support(support),
        };
        if let Err(err) = res {
            log::error!("{err}");
            if let Some(source) = std::error::Error::source(&err) {
                log::error!("  caused by: {source}");
            }
            std::process::exit(1);
        }
    }

    let state = decoder.state();
    eprintln!(
        "Processed {} messages, retired {} instructions",
        messages.len(),
        state.instruction_count
    );
    eprintln!("{}", decoder.statistics());
}

fn parse_address(value: &str) -> Result<u64, std::num::ParseIntError> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    }
}
