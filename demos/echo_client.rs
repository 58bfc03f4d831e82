use log::{error, info};
use std::time::Duration;
use ws_sync::client::connect;
use ws_sync::error::Error;
use ws_sync::frame::OpCode;

fn handle_connection(addr: &str) {
    match connect(addr, &[]) {
        Ok(mut connection) => {
            // Don't hang forever on a server that stops answering.
            if let Err(err) = connection.set_read_timeout(Some(Duration::from_secs(10))) {
                error!("couldn't install a read timeout: {}", err);
                return;
            }

            let mut buf = vec![0u8; 64 * 1024];
            for counter in 0..3 {
                let text = format!("echo message {}", counter);
                if connection.send_text(&text).is_err() {
                    error!("failed to send message");
                    break;
                }

                match connection.receive_into_buffer(&mut buf, 0) {
                    Ok(message) => match message.opcode {
                        OpCode::Text | OpCode::Binary => {
                            let payload = message.as_slice().unwrap_or(&[]);
                            info!("received: {}", String::from_utf8_lossy(payload));
                        }
                        OpCode::Close => {
                            info!("server closed with code {:?}", message.code);
                            return;
                        }
                        other => info!("received a {:?} frame", other),
                    },
                    Err(Error::WouldBlock) => {
                        error!("server went quiet, giving up");
                        break;
                    }
                    Err(err) => {
                        error!("received error from the stream: {}", err);
                        break;
                    }
                }
            }

            if connection.close_with(1000, b"done").is_err() {
                error!("error occurred when closing connection");
            }
        }
        Err(err) => error!("error when performing handshake: {}", err),
    }
}

fn main() {
    env_logger::init();
    handle_connection("ws://127.0.0.1:9002");
}
