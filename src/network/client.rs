//! TCP dialer for joining rooms

use super::peer::Link;
use super::protocol::Message;
use std::io;
use std::net::SocketAddr;

/// A guest's single link to the host.
pub struct Client {
    link: Link,
}

impl Client {
    /// Dial the host at the given socket address.
    pub fn connect_addr(addr: SocketAddr) -> io::Result<Self> {
        let link = Link::connect(addr)?;
        Ok(Client { link })
    }

    /// Send a message up to the host.
    pub fn send(&self, msg: Message) -> io::Result<()> {
        self.link.send(msg)
    }

    /// Poll for messages from the host.
    pub fn poll(&mut self) -> Vec<Message> {
        self.link.recv_all()
    }

    /// Check if still connected.
    pub fn is_connected(&self) -> bool {
        self.link.is_alive()
    }

    /// The host's address.
    pub fn host_addr(&self) -> SocketAddr {
        self.link.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::server::{Server, ServerEvent};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_client_connects_and_joins() {
        let mut server = Server::start_on_port(56120).unwrap();
        let addr = server.addr();

        let client = Client::connect_addr(addr).unwrap();
        client
            .send(Message::JoinRequest { name: "TestPlayer".to_string() })
            .unwrap();

        thread::sleep(Duration::from_millis(200));
        let events = server.poll();

        assert!(events.iter().any(|e| matches!(e, ServerEvent::LinkOpened { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::MessageReceived {
                message: Message::JoinRequest { name },
                ..
            } if name == "TestPlayer"
        )));
    }

    #[test]
    fn test_client_receives_broadcast() {
        let mut server = Server::start_on_port(56130).unwrap();
        let addr = server.addr();

        let mut client = Client::connect_addr(addr).unwrap();

        thread::sleep(Duration::from_millis(100));
        server.poll();

        server.broadcast(&Message::StartRound {
            round_number: 1,
            word: "CRANE".to_string(),
        });

        thread::sleep(Duration::from_millis(100));
        let messages = client.poll();

        assert!(messages.iter().any(|m| matches!(
            m,
            Message::StartRound { round_number: 1, word } if word == "CRANE"
        )));
    }
}
