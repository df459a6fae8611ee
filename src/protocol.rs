//! Wire commands
//!
//! Text-frame protocol: the first space-delimited token selects the
//! command, the remainder is its payload. `SIGS` is the one multi-line
//! command, carrying a tab-separated scanner paste below its header line.

use crate::error::{MapError, Result};
use crate::model::{AddRequest, EdgeFlag, Signature};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Helo {
        username: String,
    },
    Add(AddRequest),
    Delete {
        name: String,
    },
    Detach {
        name: String,
    },
    Toggle {
        flag: EdgeFlag,
        src: String,
        dest: String,
    },
    Autocomplete {
        prefix: String,
    },
    Signatures {
        system: String,
        mode: String,
        sigs: Vec<Signature>,
    },
    SignatureNote {
        system: String,
        id: String,
        note: String,
    },
    DeleteSignature {
        system: String,
        id: Option<String>,
    },
}

/// Parse one inbound text frame.
pub fn parse(message: &str) -> Result<Command> {
    let (verb, rest) = message.split_once(' ').unwrap_or((message, ""));
    match verb {
        "HELO" => {
            if rest.is_empty() {
                return Err(bad(message));
            }
            Ok(Command::Helo {
                username: rest.to_string(),
            })
        }
        "ADD" => {
            let request: AddRequest =
                serde_json::from_str(rest).map_err(|_| bad(message))?;
            Ok(Command::Add(request))
        }
        "DELETE" if !rest.is_empty() => Ok(Command::Delete {
            name: rest.to_string(),
        }),
        "DETACH" if !rest.is_empty() => Ok(Command::Detach {
            name: rest.to_string(),
        }),
        "EOL" => parse_toggle(EdgeFlag::Eol, rest, message),
        "REDUCED" => parse_toggle(EdgeFlag::Reduced, rest, message),
        "CRITICAL" => parse_toggle(EdgeFlag::Critical, rest, message),
        "FRIGATE" => parse_toggle(EdgeFlag::Frigate, rest, message),
        "SYS" if !rest.is_empty() => Ok(Command::Autocomplete {
            prefix: rest.to_string(),
        }),
        "SIGS" => parse_sigs(rest, message),
        "SIGNOTE" => {
            let mut parts = rest.splitn(3, ' ');
            match (parts.next(), parts.next()) {
                (Some(system), Some(id)) if !system.is_empty() && !id.is_empty() => {
                    Ok(Command::SignatureNote {
                        system: system.to_string(),
                        id: id.to_string(),
                        note: parts.next().unwrap_or("").to_string(),
                    })
                }
                _ => Err(bad(message)),
            }
        }
        "DELSIG" => {
            let (system, id) = rest.split_once(' ').unwrap_or((rest, ""));
            if system.is_empty() {
                return Err(bad(message));
            }
            Ok(Command::DeleteSignature {
                system: system.to_string(),
                id: (!id.is_empty()).then(|| id.to_string()),
            })
        }
        _ => Err(bad(message)),
    }
}

fn bad(message: &str) -> MapError {
    MapError::BadCommand(message.chars().take(64).collect())
}

/// Toggle payloads are `<src> <dest>`; dest may itself contain spaces.
fn parse_toggle(flag: EdgeFlag, rest: &str, message: &str) -> Result<Command> {
    let (src, dest) = rest.split_once(' ').ok_or_else(|| bad(message))?;
    if src.is_empty() || dest.is_empty() {
        return Err(bad(message));
    }
    Ok(Command::Toggle {
        flag,
        src: src.to_string(),
        dest: dest.to_string(),
    })
}

/// `SIGS` payload: a header line `<system> <mode>` (the mode is the token
/// after the last space), then tab-separated scanner rows. A malformed row
/// silently ends the batch; rows already parsed are kept.
fn parse_sigs(rest: &str, message: &str) -> Result<Command> {
    let (header, body) = rest.split_once('\n').unwrap_or((rest, ""));
    let (system, mode) = header.rsplit_once(' ').ok_or_else(|| bad(message))?;
    if system.is_empty() || mode.is_empty() {
        return Err(bad(message));
    }

    let mut sigs = Vec::new();
    for line in body.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 5 {
            break;
        }
        let Ok(signal_strength) = fields[3].trim_end_matches('%').parse::<f64>() else {
            break;
        };
        sigs.push(Signature {
            id: fields[0].to_string(),
            scan_group: fields[1].to_string(),
            kind: fields[2].to_string(),
            signal_strength,
            distance: fields[4].to_string(),
            note: String::new(),
        });
    }

    Ok(Command::Signatures {
        system: system.to_string(),
        mode: mode.to_string(),
        sigs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helo_carries_the_username() {
        assert_eq!(
            parse("HELO alice").unwrap(),
            Command::Helo {
                username: "alice".to_string()
            }
        );
        assert!(parse("HELO").is_err());
    }

    #[test]
    fn add_takes_a_json_payload() {
        let Command::Add(req) = parse(r#"ADD {"dest":"J164522","src":"Jita"}"#).unwrap() else {
            panic!("expected ADD");
        };
        assert_eq!(req.dest, "J164522");
        assert_eq!(req.src.as_deref(), Some("Jita"));

        let Command::Add(req) = parse(r#"ADD {"dest":"Jita"}"#).unwrap() else {
            panic!("expected ADD");
        };
        assert!(req.src.is_none());

        assert!(parse("ADD not-json").is_err());
    }

    #[test]
    fn toggles_split_src_then_dest() {
        assert_eq!(
            parse("EOL Jita J164522").unwrap(),
            Command::Toggle {
                flag: EdgeFlag::Eol,
                src: "Jita".to_string(),
                dest: "J164522".to_string(),
            }
        );
        // Destination names may contain spaces; the source never does.
        assert_eq!(
            parse("CRITICAL Jita Old Man Star").unwrap(),
            Command::Toggle {
                flag: EdgeFlag::Critical,
                src: "Jita".to_string(),
                dest: "Old Man Star".to_string(),
            }
        );
        assert!(parse("REDUCED Jita").is_err());
        assert!(parse("FRIGATE").is_err());
    }

    #[test]
    fn sigs_parses_the_tabular_block() {
        let frame = "SIGS J164522 replace\n\
                     ABC-123\tCosmic Signature\tWormhole\t12.5%\t4.2 AU\n\
                     DEF-456\tCosmic Signature\tData Site\t100.0%\t1.1 AU";
        let Command::Signatures { system, mode, sigs } = parse(frame).unwrap() else {
            panic!("expected SIGS");
        };
        assert_eq!(system, "J164522");
        assert_eq!(mode, "replace");
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].id, "ABC-123");
        assert_eq!(sigs[0].signal_strength, 12.5);
        assert_eq!(sigs[1].kind, "Data Site");
        assert!(sigs.iter().all(|s| s.note.is_empty()));
    }

    #[test]
    fn sigs_system_names_with_spaces_keep_the_last_token_as_mode() {
        let Command::Signatures { system, mode, sigs } =
            parse("SIGS Old Man Star add").unwrap()
        else {
            panic!("expected SIGS");
        };
        assert_eq!(system, "Old Man Star");
        assert_eq!(mode, "add");
        assert!(sigs.is_empty());
    }

    #[test]
    fn malformed_sig_row_ends_the_batch() {
        let frame = "SIGS J164522 replace\n\
                     ABC-123\tCosmic Signature\tWormhole\t12.5%\t4.2 AU\n\
                     garbage line without tabs\n\
                     DEF-456\tCosmic Signature\tData Site\t100.0%\t1.1 AU";
        let Command::Signatures { sigs, .. } = parse(frame).unwrap() else {
            panic!("expected SIGS");
        };
        assert_eq!(sigs.len(), 1);

        let frame = "SIGS J164522 replace\n\
                     ABC-123\tCosmic Signature\tWormhole\tnot-a-number\t4.2 AU";
        let Command::Signatures { sigs, .. } = parse(frame).unwrap() else {
            panic!("expected SIGS");
        };
        assert!(sigs.is_empty());
    }

    #[test]
    fn signote_keeps_the_note_verbatim() {
        assert_eq!(
            parse("SIGNOTE J164522 ABC-123 leads to highsec").unwrap(),
            Command::SignatureNote {
                system: "J164522".to_string(),
                id: "ABC-123".to_string(),
                note: "leads to highsec".to_string(),
            }
        );
        assert_eq!(
            parse("SIGNOTE J164522 ABC-123").unwrap(),
            Command::SignatureNote {
                system: "J164522".to_string(),
                id: "ABC-123".to_string(),
                note: String::new(),
            }
        );
        assert!(parse("SIGNOTE J164522").is_err());
    }

    #[test]
    fn delsig_id_is_optional() {
        assert_eq!(
            parse("DELSIG J164522 ABC-123").unwrap(),
            Command::DeleteSignature {
                system: "J164522".to_string(),
                id: Some("ABC-123".to_string()),
            }
        );
        assert_eq!(
            parse("DELSIG J164522").unwrap(),
            Command::DeleteSignature {
                system: "J164522".to_string(),
                id: None,
            }
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(matches!(parse("NOPE payload"), Err(MapError::BadCommand(_))));
        assert!(matches!(parse(""), Err(MapError::BadCommand(_))));
    }
}
