// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_known_in_band_commands() {
    assert_eq!(TerminalCommand::parse("@resume"), Some(TerminalCommand::Resume));
    assert_eq!(TerminalCommand::parse("@abort"), Some(TerminalCommand::Abort));
    assert_eq!(TerminalCommand::parse("@status"), Some(TerminalCommand::Status));
    assert_eq!(TerminalCommand::parse("@help"), Some(TerminalCommand::Help));
}

#[test]
fn non_command_input_is_forwarded() {
    assert_eq!(TerminalCommand::parse("ls -la"), None);
    assert_eq!(TerminalCommand::parse(""), None);
}

#[test]
fn trims_surrounding_whitespace() {
    assert_eq!(TerminalCommand::parse("  @resume\n"), Some(TerminalCommand::Resume));
}
