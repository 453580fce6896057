#![no_std]
#![no_main]

mod peripherals;
mod system;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Device
use embassy_executor::Spawner;
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    interrupt::{self, InterruptExt, Priority},
    peripherals::SPI2,
    saadc::{self, ChannelConfig, Resolution, Saadc},
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel};
use embassy_time::{Duration, Timer};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{
    backlight::Backlight,
    battery::Battery,
    button::Button,
    display::{Display, LCD_SIZE},
};
use pinetime_weatherface::{
    battery::BatteryChargeState,
    message::{AppMessageResult, Dictionary},
    Event, Host, WatchApp, WatchFaceConfig,
};
use system::{
    bluetooth::{self, Server},
    config::{self, BACKLIGHT_LEVEL, BATTERY_POLL_SECS, CLOCK_STYLE},
    time,
};

// Others
use chrono::NaiveDateTime;

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

const FACE_CONFIG: WatchFaceConfig = WatchFaceConfig::pinetime();

// Communication channels
pub(crate) static EVENTS: Channel<ThreadModeRawMutex, Event, 4> = Channel::new();
pub(crate) static OUTBOX: Channel<ThreadModeRawMutex, Dictionary, 2> = Channel::new();

static SERVER: StaticCell<Server> = StaticCell::new();

/// Platform services backed by the watch hardware
struct FirmwareHost {
    battery: BatteryChargeState,
}

impl Host for FirmwareHost {
    fn local_time(&self) -> NaiveDateTime {
        time::local_time()
    }

    fn clock_is_24h_style(&self) -> bool {
        CLOCK_STYLE.is_24h()
    }

    fn battery_state(&self) -> BatteryChargeState {
        self.battery
    }

    fn outbox_send(&mut self, message: &Dictionary) -> Result<(), AppMessageResult> {
        OUTBOX
            .try_send(message.clone())
            .map_err(|_| AppMessageResult::Busy)
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Emit a tick at the start of every minute.
#[embassy_executor::task(pool_size = 1)]
async fn minute_tick() {
    loop {
        Timer::after(Duration::from_secs(time::secs_to_next_minute())).await;
        EVENTS.send(Event::Tick(time::local_time())).await;
    }
}

/// Fetch the battery status from the hardware.
#[embassy_executor::task(pool_size = 1)]
async fn update_battery_status(mut battery: Battery, mut last: BatteryChargeState) {
    loop {
        // Re-schedule the timer interrupt
        Timer::after(Duration::from_secs(BATTERY_POLL_SECS)).await;

        let state = battery.state().await;
        if state != last {
            defmt::info!(
                "Battery status: {}% ({})",
                state.charge_percent,
                if state.is_charging {
                    "charging"
                } else {
                    "discharging"
                }
            );
            last = state;
            EVENTS.send(Event::BatteryChanged(state)).await;
        }
    }
}

/// Polls the button every 10ms, a press hides or shows the watchface.
#[embassy_executor::task(pool_size = 1)]
async fn poll_button(mut button: Button) {
    // The watchface task loads the window on start
    let mut visible = true;
    loop {
        if button.pressed().await {
            visible = !visible;
            EVENTS
                .send(if visible {
                    Event::WindowLoad(LCD_SIZE)
                } else {
                    Event::WindowUnload
                })
                .await;
        }

        // Re-schedule the timer interrupt in 10ms
        Timer::after(Duration::from_millis(10)).await;
    }
}

/// Run the watchface and redraw after every event.
///
/// The backlight follows the window: off while unloaded.
#[embassy_executor::task(pool_size = 1)]
async fn watchface(
    mut app: WatchApp<FirmwareHost>,
    mut display: Display<SPI2>,
    mut backlight: Backlight,
    server: &'static Server,
) {
    app.init(LCD_SIZE);
    loop {
        if let Err(e) = display.render(app.face()) {
            defmt::error!("Failed to draw watchface: {:?}", e);
        }

        let event = EVENTS.receive().await;
        match &event {
            Event::BatteryChanged(state) => {
                app.host_mut().battery = *state;
                if server.bas.battery_level_set(&state.charge_percent).is_err() {
                    defmt::warn!("Failed to update battery service");
                }
            }
            Event::WindowLoad(_) => unwrap!(backlight.set(BACKLIGHT_LEVEL)),
            Event::WindowUnload => unwrap!(backlight.set(0)),
            _ => {}
        }
        app.handle(event);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(config::embassy_config());
    defmt::info!("Initializing");

    time::init(UTC_EPOCH, FACE_CONFIG.utc_offset_secs);

    // Keep clear of the priorities reserved for the SoftDevice
    interrupt::SAADC.set_priority(Priority::P3);
    interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);

    // Initialize SAADC
    let mut saadc_config = saadc::Config::default();
    // Set resolution to 12bit, necessary for correct battery status calculation
    saadc_config.resolution = Resolution::_12BIT;
    // Pin P0.31: Voltage level
    let channel_config = ChannelConfig::single_ended(p.P0_31);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc_config, [channel_config]);
    saadc.calibrate().await;

    // Initialize Backlight
    let backlight = unwrap!(Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
        BACKLIGHT_LEVEL,
    ));

    // Initalize Battery
    let mut battery = Battery::init(saadc, Input::new(p.P0_12, Pull::None));
    let battery_state = battery.state().await;

    // Initialize Button
    let button = Button::init(
        Input::new(p.P0_13, Pull::None),
        Output::new(p.P0_15, Level::Low, OutputDrive::Standard),
    );

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Initialize Bluetooth
    let sd = Softdevice::enable(&config::softdevice_config());
    let server = SERVER.init(unwrap!(Server::new(sd)));
    if server
        .bas
        .battery_level_set(&battery_state.charge_percent)
        .is_err()
    {
        defmt::warn!("Failed to set initial battery level");
    }

    let app = WatchApp::new(
        FirmwareHost {
            battery: battery_state,
        },
        FACE_CONFIG,
    );

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(bluetooth::run(sd, server)));
    unwrap!(spawner.spawn(minute_tick()));
    unwrap!(spawner.spawn(poll_button(button)));
    unwrap!(spawner.spawn(update_battery_status(battery, battery_state)));
    unwrap!(spawner.spawn(watchface(app, display, backlight, server)));
}
