//! Reads queries off the listening UDP socket into the work queue on a dedicated
//! read thread, copying each datagram out of a fixed 512-byte buffer before handing
//! it to the worker pool.

use std::net::UdpSocket;
use std::sync::Arc;
use std::thread::{self, Builder};

use crate::context::AppContext;
use crate::queue::RequestDescriptor;

const MAX_QUERY_SIZE: usize = 512;

pub struct Receiver {
    context: Arc<AppContext>,
    socket: UdpSocket,
}

impl Receiver {
    pub fn new(context: Arc<AppContext>, socket: UdpSocket) -> Receiver {
        Receiver { context, socket }
    }

    /// Spawns the read loop on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        Builder::new().name("receiver".into()).spawn(move || {
            let mut buf = [0u8; MAX_QUERY_SIZE];
            loop {
                if self.context.is_shutting_down() {
                    return;
                }

                let (len, client_addr) = match self.socket.recv_from(&mut buf) {
                    Ok(x) => x,
                    Err(e) => {
                        log::warn!("failed to read from udp socket: {}", e);
                        continue;
                    }
                };

                self.context.queue.enqueue(RequestDescriptor {
                    client_addr,
                    bytes: buf[..len].to_vec(),
                });
            }
        })
    }
}
