use super::Command;
use crate::channel;
use crate::error::{Error, Result};
use crate::ClientId;

/// Parse one console line into a command
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let name = name.to_ascii_lowercase();

    let command = match name.as_str() {
        "create" => {
            expect_arity(&name, &args, 0)?;
            Command::Create
        }
        "destroy" => {
            expect_arity(&name, &args, 1)?;
            Command::Destroy(ClientId::from(args[0]))
        }
        "exists" => {
            expect_arity(&name, &args, 1)?;
            Command::Exists(ClientId::from(args[0]))
        }
        "ping" => {
            expect_arity(&name, &args, 1)?;
            Command::Ping(ClientId::from(args[0]))
        }
        "subscribe" => {
            expect_arity(&name, &args, 2)?;
            Command::Subscribe {
                client_id: ClientId::from(args[0]),
                channel: subscribable(args[1])?,
            }
        }
        "unsubscribe" => {
            expect_arity(&name, &args, 2)?;
            Command::Unsubscribe {
                client_id: ClientId::from(args[0]),
                channel: subscribable(args[1])?,
            }
        }
        "publish" => {
            // The payload is the raw remainder so JSON may contain spaces.
            let Some((channel, data)) = rest.split_once(char::is_whitespace) else {
                return Err(Error::WrongArity(name.clone()));
            };
            if !channel::is_name(channel) {
                return Err(Error::InvalidChannel(channel.to_string()));
            }
            Command::Publish {
                channel: channel.to_string(),
                data: serde_json::from_str(data.trim())?,
            }
        }
        "connect" => {
            expect_arity(&name, &args, 1)?;
            Command::Connect(ClientId::from(args[0]))
        }
        "disconnect" => {
            expect_arity(&name, &args, 1)?;
            Command::Disconnect(ClientId::from(args[0]))
        }
        "pending" => {
            expect_arity(&name, &args, 1)?;
            Command::Pending(ClientId::from(args[0]))
        }
        "stats" => {
            expect_arity(&name, &args, 0)?;
            Command::Stats
        }
        "quit" | "exit" => Command::Quit,
        _ => return Err(Error::InvalidCommand(name.clone())),
    };

    Ok(Some(command))
}

fn expect_arity(name: &str, args: &[&str], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::WrongArity(name.to_string()));
    }
    Ok(())
}

fn subscribable(name: &str) -> Result<String> {
    if !channel::is_subscribable(name) {
        return Err(Error::InvalidChannel(name.to_string()));
    }
    Ok(name.to_string())
}
