//! Bluetooth module
//!
//! The phone talks to the watchface through a small GATT service: it writes weather
//! messages to `inbox`, listens for requests on `outbox` and may set the clock through
//! `time`. The standard Battery Service mirrors the charge shown on the face.

use embassy_futures::select::{select, Either};
use heapless::Vec;
use nrf_softdevice::{
    ble::{
        advertisement_builder::{
            Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
            ServiceUuid16,
        },
        gatt_server, peripheral, Connection,
    },
    Softdevice,
};
use pinetime_weatherface::{
    clock,
    message::{AppMessageResult, Dictionary, MAX_MESSAGE_LEN},
    Event,
};

use crate::{system::time, EVENTS, OUTBOX};

const OUTBOX_LEN: usize = 32;

pub static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Complete, &[ServiceUuid16::BATTERY])
    .full_name("PineTime")
    .build();

pub static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_16(ServiceList::Complete, &[ServiceUuid16::BATTERY])
    .build();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub bas: BatteryService,
    pub weather: WeatherService,
}

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_service(uuid = "5e1d0000-7c9a-4c1e-9a53-7f0a3b2c9d10")]
pub struct WeatherService {
    /// Messages from the phone
    #[characteristic(uuid = "5e1d0001-7c9a-4c1e-9a53-7f0a3b2c9d10", write)]
    pub inbox: Vec<u8, 128>,
    /// Messages to the phone
    #[characteristic(uuid = "5e1d0002-7c9a-4c1e-9a53-7f0a3b2c9d10", read, notify)]
    pub outbox: Vec<u8, 32>,
    /// Current Time Service style exact time
    #[characteristic(uuid = "5e1d0003-7c9a-4c1e-9a53-7f0a3b2c9d10", write)]
    pub time: Vec<u8, 10>,
}

/// Advertise, serve the phone, repeat.
#[embassy_executor::task]
pub async fn run(sd: &'static Softdevice, server: &'static Server) -> ! {
    loop {
        let config = peripheral::Config::default();
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };

        // Nobody to send to while advertising
        let conn = match select(
            peripheral::advertise_connectable(sd, adv, &config),
            reject_outbox(),
        )
        .await
        {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                defmt::warn!("Advertising failed: {:?}", e);
                continue;
            }
            Either::Second(never) => match never {},
        };
        defmt::info!("Phone connected");

        let gatt = gatt_server::run(&conn, server, |e| on_server_event(e));
        select(gatt, forward_outbox(server, &conn)).await;
        defmt::info!("Phone disconnected");
    }
}

fn on_server_event(event: ServerEvent) {
    match event {
        ServerEvent::Weather(WeatherServiceEvent::InboxWrite(bytes)) => {
            let event = match Dictionary::from_bytes(&bytes) {
                Ok(message) => Event::InboxReceived(message),
                Err(e) => {
                    defmt::warn!("Malformed message: {:?}", e);
                    Event::InboxDropped(e.into())
                }
            };
            if EVENTS.try_send(event).is_err() {
                defmt::error!("Event queue full, message lost");
            }
        }
        ServerEvent::Weather(WeatherServiceEvent::TimeWrite(bytes)) => {
            match clock::from_cts_bytes(&bytes) {
                Ok(utc) => {
                    defmt::info!("Clock set by phone");
                    time::set_utc(utc);
                }
                Err(e) => defmt::warn!("Invalid time from phone: {:?}", e),
            }
        }
        ServerEvent::Weather(WeatherServiceEvent::OutboxCccdWrite { notifications }) => {
            defmt::info!("Outbox notifications: {}", notifications);
        }
        ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
            defmt::info!("Battery notifications: {}", notifications);
        }
    }
}

/// Notify queued messages to the connected phone and report the outcome.
async fn forward_outbox(server: &Server, conn: &Connection) {
    loop {
        let message = OUTBOX.receive().await;
        let result = encode(&message).and_then(|bytes| {
            server
                .weather
                .outbox_notify(conn, &bytes)
                .map_err(|_| AppMessageResult::SendRejected)
        });
        EVENTS
            .send(match result {
                Ok(()) => Event::OutboxSent,
                Err(reason) => Event::OutboxFailed(reason),
            })
            .await;
    }
}

/// Fail every message queued while no phone is connected.
///
/// Only the receive may be cancelled by a new connection, so a taken message is
/// always reported.
async fn reject_outbox() -> ! {
    loop {
        OUTBOX.receive().await;
        if EVENTS
            .try_send(Event::OutboxFailed(AppMessageResult::NotConnected))
            .is_err()
        {
            defmt::error!("Event queue full, outbox failure lost");
        }
    }
}

fn encode(message: &Dictionary) -> Result<Vec<u8, OUTBOX_LEN>, AppMessageResult> {
    let mut buf = [0u8; MAX_MESSAGE_LEN];
    let len = message.write_to(&mut buf)?;
    Vec::from_slice(&buf[..len]).map_err(|_| AppMessageResult::BufferOverflow)
}
