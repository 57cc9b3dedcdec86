//! Line-oriented console for driving an engine by hand
//!
//! Connected clients receive their messages as `message <client> <json>`
//! lines on the console's output.

mod parser;

pub use parser::parse_command;

use crate::connection::{Connection, ConnectionRegistry};
use crate::error::{Error, Result};
use crate::{ClientId, Engine, Message};
use parking_lot::Mutex;
use serde_json::Value;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum Command {
    Create,
    Destroy(ClientId),
    Exists(ClientId),
    Ping(ClientId),
    Subscribe { client_id: ClientId, channel: String },
    Unsubscribe { client_id: ClientId, channel: String },
    Publish { channel: String, data: Value },
    Connect(ClientId),
    Disconnect(ClientId),
    Pending(ClientId),
    Stats,
    Quit,
}

pub type SharedOutput = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes delivered messages to the console output
struct OutputConnection {
    client_id: ClientId,
    out: SharedOutput,
}

impl Connection for OutputConnection {
    fn deliver(&self, message: Message) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode message for {}: {}", self.client_id, e);
                return;
            }
        };
        let mut out = self.out.lock();
        let _ = writeln!(out, "message {} {}", self.client_id, json);
        let _ = out.flush();
    }
}

/// Executes console commands against one engine
pub struct Console {
    engine: Engine,
    connections: Arc<ConnectionRegistry>,
    out: SharedOutput,
}

impl Console {
    pub fn new(engine: Engine, connections: Arc<ConnectionRegistry>, out: SharedOutput) -> Self {
        Self {
            engine,
            connections,
            out,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Parse and execute one line, returning the reply (None on quit)
    pub fn handle_line(&self, line: &str) -> Option<String> {
        match parse_command(line) {
            Ok(None) => Some(String::new()),
            Ok(Some(Command::Quit)) => None,
            Ok(Some(command)) => Some(self.execute(command).unwrap_or_else(|e| e.to_reply())),
            Err(e) => {
                warn!("Rejected console input: {}", e);
                Some(e.to_reply())
            }
        }
    }

    pub fn execute(&self, command: Command) -> Result<String> {
        let engine = &self.engine;

        let reply = match command {
            Command::Create => engine.create_client().to_string(),
            Command::Destroy(id) => bool_reply(engine.destroy_client(&id)),
            Command::Exists(id) => bool_reply(engine.client_exists(&id)),
            Command::Ping(id) => {
                self.require_client(&id)?;
                engine.ping(&id);
                "OK".to_string()
            }
            Command::Subscribe { client_id, channel } => {
                self.require_client(&client_id)?;
                bool_reply(engine.subscribe(&client_id, &channel))
            }
            Command::Unsubscribe { client_id, channel } => {
                bool_reply(engine.unsubscribe(&client_id, &channel))
            }
            Command::Publish { channel, data } => {
                engine.publish(Message::new(channel, data)).to_string()
            }
            Command::Connect(id) => {
                self.require_client(&id)?;
                let conn = OutputConnection {
                    client_id: id.clone(),
                    out: Arc::clone(&self.out),
                };
                self.connections.attach(id.clone(), Arc::new(conn));
                engine.flush(&id).to_string()
            }
            Command::Disconnect(id) => bool_reply(self.connections.detach(&id).is_some()),
            Command::Pending(id) => {
                let messages = engine.pending(&id);
                serde_json::to_string(&messages)?
            }
            Command::Stats => {
                let stats = engine.stats();
                format!(
                    "clients={} channels={} pending={} created={} destroyed={} expired={} published={} queued={} delivered={}",
                    engine.client_count(),
                    engine.channel_count(),
                    engine.pending_count(),
                    stats.clients_created.load(Ordering::Relaxed),
                    stats.clients_destroyed.load(Ordering::Relaxed),
                    stats.clients_expired.load(Ordering::Relaxed),
                    stats.messages_published.load(Ordering::Relaxed),
                    stats.messages_queued.load(Ordering::Relaxed),
                    stats.messages_delivered.load(Ordering::Relaxed),
                )
            }
            Command::Quit => String::new(),
        };

        Ok(reply)
    }

    // The console only subscribes registered clients, unlike the engine.
    fn require_client(&self, id: &ClientId) -> Result<()> {
        if !self.engine.client_exists(id) {
            return Err(Error::UnknownClient(id.to_string()));
        }
        Ok(())
    }
}

fn bool_reply(value: bool) -> String {
    let reply = if value { "1" } else { "0" };
    reply.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn console() -> (Console, Buffer) {
        let buffer = Buffer::default();
        let connections = Arc::new(ConnectionRegistry::new());
        let engine = Engine::new(Config::default(), connections.clone()).unwrap();
        let out: SharedOutput = Arc::new(Mutex::new(Box::new(buffer.clone())));
        (Console::new(engine, connections, out), buffer)
    }

    #[test]
    fn test_queue_then_connect_delivers() {
        let (console, buffer) = console();
        let id = console.handle_line("create").unwrap();

        assert_eq!(console.handle_line(&format!("subscribe {} /foo", id)).unwrap(), "1");
        assert_eq!(console.handle_line("publish /foo \"x\"").unwrap(), "1");
        assert!(buffer.0.lock().is_empty());

        assert_eq!(console.handle_line(&format!("connect {}", id)).unwrap(), "1");
        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(output, format!("message {} {{\"channel\":\"/foo\",\"data\":\"x\"}}\n", id));
    }

    #[test]
    fn test_unknown_client_is_rejected() {
        let (console, _) = console();
        assert_eq!(
            console.handle_line("subscribe ghost /foo").unwrap(),
            "ERR Unknown client: ghost"
        );
        assert_eq!(console.handle_line("exists ghost").unwrap(), "0");
    }

    #[test]
    fn test_quit_ends_session() {
        let (console, _) = console();
        assert!(console.handle_line("quit").is_none());
        assert_eq!(console.handle_line("").unwrap(), "");
    }

    #[test]
    fn test_stats_reply() {
        let (console, _) = console();
        console.handle_line("create");
        let stats = console.handle_line("stats").unwrap();
        assert!(stats.starts_with("clients=1 channels=0 pending=0 created=1 destroyed=0"));

        let id = console.handle_line("create").unwrap();
        console.handle_line(&format!("subscribe {} /foo", id));
        console.handle_line("publish /foo 1");
        let stats = console.handle_line("stats").unwrap();
        assert!(stats.starts_with("clients=2 channels=1 pending=1 created=2"));
    }
}
