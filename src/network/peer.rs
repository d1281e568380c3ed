//! Peer link handling
//!
//! One `Link` per TCP connection, with reader and writer threads bridged to
//! the single-threaded session loop through channels. Per-link delivery is
//! ordered and message-boundary preserving; a frame that decodes to an
//! unknown or malformed message is dropped, not fatal to the link.

use super::protocol::Message;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

/// A connected peer link.
pub struct Link {
    /// Remote address of the link.
    pub addr: SocketAddr,
    /// Channel to send messages to this peer
    tx: Sender<Message>,
    /// Channel to receive messages from this peer
    rx: Receiver<Message>,
    /// Whether the connection is still alive
    alive: bool,
}

impl Link {
    /// Create a link from an established TCP stream.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let addr = stream.peer_addr()?;

        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(100)))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;

        let (outgoing_tx, outgoing_rx) = channel::<Message>();
        let (incoming_tx, incoming_rx) = channel::<Message>();

        let read_stream = stream.try_clone()?;
        let mut write_stream = stream;

        // Writer thread. Drains queued messages after the Link drops its
        // sender, so a send immediately before disconnect still goes out.
        thread::spawn(move || {
            while let Ok(msg) = outgoing_rx.recv() {
                if msg.write_to(&mut write_stream).is_err() {
                    break;
                }
            }
        });

        // Reader thread
        thread::spawn(move || {
            let mut read_stream = read_stream;
            loop {
                match Message::read_from(&mut read_stream) {
                    Ok(msg) => {
                        if incoming_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                        // Timeout, continue trying
                        continue;
                    }
                    Err(e) if e.kind() == ErrorKind::InvalidData => {
                        // Unknown or garbled message: ignore and keep reading.
                        log::warn!("ignoring undecodable message: {}", e);
                        continue;
                    }
                    Err(_) => {
                        // Connection closed or error
                        break;
                    }
                }
            }
        });

        Ok(Link {
            addr,
            tx: outgoing_tx,
            rx: incoming_rx,
            alive: true,
        })
    }

    /// Dial a peer at the given address.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, Duration::from_secs(5))?;
        Self::new(stream)
    }

    /// Send a message over this link.
    pub fn send(&self, msg: Message) -> io::Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "peer disconnected"))
    }

    /// Try to receive a message from this link (non-blocking).
    pub fn try_recv(&mut self) -> Option<Message> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.alive = false;
                None
            }
        }
    }

    /// Receive all pending messages from this link.
    pub fn recv_all(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(msg) = self.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Check if the link is still alive.
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    #[test]
    fn test_link_connect_and_send() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let link = Link::connect(addr).unwrap();
            link.send(Message::RoomFull).unwrap();
            thread::sleep(Duration::from_millis(100));
            link
        });

        let (stream, _) = listener.accept().unwrap();
        let mut server_link = Link::new(stream).unwrap();

        thread::sleep(Duration::from_millis(200));

        let messages = server_link.recv_all();
        assert!(messages.contains(&Message::RoomFull));

        handle.join().unwrap();
    }

    #[test]
    fn test_link_survives_garbled_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            // A well-framed but unknown message, then a valid one.
            let junk = br#"{"type":"warp-drive"}"#;
            stream.write_all(&(junk.len() as u32).to_be_bytes()).unwrap();
            stream.write_all(junk).unwrap();
            Message::StartRound { round_number: 1, word: "CRANE".to_string() }
                .write_to(&mut stream)
                .unwrap();
            // Keep the socket open until the other side has read and
            // asserted; closing early would race the liveness check.
            thread::sleep(Duration::from_millis(600));
        });

        let (stream, _) = listener.accept().unwrap();
        let mut link = Link::new(stream).unwrap();

        thread::sleep(Duration::from_millis(200));

        let messages = link.recv_all();
        assert_eq!(
            messages,
            vec![Message::StartRound { round_number: 1, word: "CRANE".to_string() }]
        );
        assert!(link.is_alive());

        handle.join().unwrap();
    }
}
