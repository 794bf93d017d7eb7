//! Broker bridge link
//!
//! Talks to the Wi-Fi/MQTT bridge over UART0, one message per line as
//! `<topic> <payload>`. The task:
//! - routes lines on the control topic through the command decoder into the
//!   navigation controller
//! - forwards queued telemetry while the link is up
//! - tracks liveness: any inbound line is a heartbeat, and the first line after a
//!   silence publishes the online status
//!
//! Connection bootstrapping and reconnection live on the bridge; from here the
//! link is simply up or down.

use embassy_futures::select::{select3, Either3};
use embassy_rp::uart::{BufferedUart, Config as UartConfig};
use embassy_time::{Duration, Ticker};
use embedded_io_async::{Read, Write};
use static_cell::StaticCell;

use hermes_robot::system::command;
use hermes_robot::system::link::{split_line, LineAssembler, LinkMonitor};
use hermes_robot::system::telemetry::{encode, StatusTelemetry};

use crate::resources::{Irqs, LinkResources};
use crate::shared::{now_ms, set_link_up, with_navigator, CONFIG, TELEMETRY};

const BAUD_RATE: u32 = 115_200;
const LINE_CAPACITY: usize = 256;

static TX_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();

/// Write `<topic> <payload>\n`
async fn send_line<W: Write>(tx: &mut W, topic: &str, payload: &[u8]) -> Result<(), W::Error> {
    tx.write_all(topic.as_bytes()).await?;
    tx.write_all(b" ").await?;
    tx.write_all(payload).await?;
    tx.write_all(b"\n").await
}

/// Handle one complete inbound line
fn route_line(line: &[u8]) {
    let Some((topic, payload)) = split_line(line) else {
        return;
    };
    if topic == CONFIG.topics.control {
        let command = command::decode(payload);
        with_navigator(|nav| nav.apply_command(command, now_ms()));
    }
}

#[embassy_executor::task]
pub async fn link(r: LinkResources) {
    let mut config = UartConfig::default();
    config.baudrate = BAUD_RATE;
    let uart = BufferedUart::new(
        r.uart,
        r.tx_pin,
        r.rx_pin,
        Irqs,
        TX_BUFFER.init([0; 512]),
        RX_BUFFER.init([0; 256]),
        config,
    );
    let (mut tx, mut rx) = uart.split();

    let mut monitor = LinkMonitor::new(CONFIG.schedule.link_heartbeat_ms);
    let mut lines = LineAssembler::<LINE_CAPACITY>::new();
    let mut chunk = [0u8; 64];
    let mut ticker = Ticker::every(Duration::from_millis(CONFIG.schedule.link_ms));

    loop {
        match select3(rx.read(&mut chunk), TELEMETRY.receive(), ticker.next()).await {
            Either3::First(Ok(n)) => {
                for &byte in &chunk[..n] {
                    let Some(line) = lines.push(byte) else {
                        continue;
                    };

                    if monitor.on_line(now_ms()) {
                        defmt::info!("Link up");
                        set_link_up(true);
                        if let Some(status) = encode(&StatusTelemetry::ONLINE) {
                            if send_line(&mut tx, CONFIG.topics.status, status.as_bytes()).await.is_err() {
                                defmt::warn!("Link write failed");
                            }
                        }
                    }
                    route_line(line);
                }
            }
            Either3::First(Err(e)) => {
                defmt::warn!("Link read failed: {:?}", e);
                lines.abort();
            }
            Either3::Second(message) => {
                if monitor.is_connected()
                    && send_line(&mut tx, message.topic, message.payload.as_bytes()).await.is_err()
                {
                    defmt::warn!("Link write failed");
                }
            }
            Either3::Third(()) => {
                if monitor.poll(now_ms()) {
                    defmt::warn!("Link down, no line for {} ms", CONFIG.schedule.link_heartbeat_ms);
                    set_link_up(false);
                }
            }
        }
    }
}
