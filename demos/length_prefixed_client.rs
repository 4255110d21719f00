//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Length-Prefixed Client Example
//!
//! Sends a few length-prefixed frames to an echo server and prints the
//! replies. Start the server in `lv` mode first:
//!
//! ```bash
//! cargo run --example echo_server -- lv
//! cargo run --example length_prefixed_client
//! ```

use bytes::Bytes;
use frameline_codec::{FrameCodec, FramingStrategy};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9999".to_string());
    let stream = TcpStream::connect(&address).await?;
    println!("Connected to {address}");

    let mut framed = Framed::new(stream, FrameCodec::new(FramingStrategy::LengthPrefixed));

    for payload in ["hello", "", "binary\nsafe\x00payload"] {
        framed.send(Bytes::from(payload)).await?;
        match framed.next().await {
            Some(reply) => println!("sent {:?}, got {:?}", payload, reply?),
            None => {
                println!("Server closed the connection");
                break;
            }
        }
    }

    Ok(())
}
