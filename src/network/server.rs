//! TCP listener for hosting rooms

use super::peer::Link;
use super::protocol::Message;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

/// Default port for hosted rooms
pub const DEFAULT_PORT: u16 = 56110;

/// Maximum port to try when auto-incrementing
const MAX_PORT: u16 = 56210;

/// A room listener that accepts guest links.
pub struct Server {
    /// Local address the server is bound to
    addr: SocketAddr,
    /// Channel to receive newly accepted links
    new_links_rx: Receiver<Link>,
    /// Connected guest links
    links: Vec<Link>,
    /// Running flag
    running: bool,
}

impl Server {
    /// Start a new server on the default port with auto-increment
    pub fn start() -> io::Result<Self> {
        Self::start_on_port(DEFAULT_PORT)
    }

    /// Start a new server on a specific port with auto-increment fallback
    pub fn start_on_port(start_port: u16) -> io::Result<Self> {
        let mut port = start_port;
        let listener = loop {
            match TcpListener::bind(format!("0.0.0.0:{}", port)) {
                Ok(l) => break l,
                Err(e) if e.kind() == io::ErrorKind::AddrInUse && port < MAX_PORT => {
                    port += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let (new_links_tx, new_links_rx) = channel();

        // Spawn acceptor thread
        thread::spawn(move || {
            accept_loop(listener, new_links_tx);
        });

        Ok(Server {
            addr,
            new_links_rx,
            links: Vec::new(),
            running: true,
        })
    }

    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the port the server is listening on
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Poll for new links and messages
    pub fn poll(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        // Accept new links
        loop {
            match self.new_links_rx.try_recv() {
                Ok(link) => {
                    events.push(ServerEvent::LinkOpened { addr: link.addr });
                    self.links.push(link);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running = false;
                    break;
                }
            }
        }

        // Collect messages and track disconnections
        let mut closed = Vec::new();
        for (i, link) in self.links.iter_mut().enumerate() {
            for msg in link.recv_all() {
                events.push(ServerEvent::MessageReceived {
                    from: link.addr,
                    message: msg,
                });
            }
            if !link.is_alive() {
                closed.push(i);
            }
        }

        // Remove dead links (in reverse order to preserve indices)
        for i in closed.into_iter().rev() {
            let link = self.links.remove(i);
            events.push(ServerEvent::LinkClosed { addr: link.addr });
        }

        events
    }

    /// Send a message to every connected link.
    pub fn broadcast(&self, msg: &Message) {
        for link in &self.links {
            let _ = link.send(msg.clone());
        }
    }

    /// Send a message to every connected link except one. This is the relay
    /// fanout: a gameplay event is never echoed back to its sender.
    pub fn broadcast_except(&self, exclude: SocketAddr, msg: &Message) {
        for link in &self.links {
            if link.addr != exclude {
                let _ = link.send(msg.clone());
            }
        }
    }

    /// Send a message to a specific link by address.
    pub fn send_to(&self, addr: SocketAddr, msg: &Message) -> io::Result<()> {
        for link in &self.links {
            if link.addr == addr {
                return link.send(msg.clone());
            }
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "link not found"))
    }

    /// Drop a link. Queued outbound messages (such as a `room-full`
    /// rejection) are flushed by the writer thread before the socket closes.
    pub fn disconnect(&mut self, addr: SocketAddr) {
        self.links.retain(|link| link.addr != addr);
    }

    /// Number of connected links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Check if the server is still running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop the server
    pub fn stop(&mut self) {
        self.running = false;
        self.links.clear();
    }
}

/// Events from the server
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new link opened
    LinkOpened { addr: SocketAddr },
    /// A link closed
    LinkClosed { addr: SocketAddr },
    /// A message arrived on a link
    MessageReceived { from: SocketAddr, message: Message },
}

fn accept_loop(listener: TcpListener, tx: Sender<Link>) {
    loop {
        match listener.accept() {
            Ok((stream, _addr)) => {
                if let Ok(link) = Link::new(stream) {
                    if tx.send(link).is_err() {
                        break;
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(_) => break,
        }
    }
}
