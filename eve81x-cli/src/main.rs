// In the long run this will hopefully become a convenient CLI command for
// exercising an EVE chip from a "normal computer", via interfaces like
// Linux spidev or a SPIDriver adapter. For now though it's just a small
// test bed for trying out the library crates against real hardware.

use eve81x::commands::options::OPT_CENTER;
use eve81x::display_list::DLCmd;
use eve81x::init::ClockSource;
use eve81x::screen::{ScreenShape, Timings};
use eve81x::EVE;
use serial_embedded_hal::{PortSettings, Serial};
use spidriver::SPIDriver;
use std::path::Path;

fn main() {
    let serial = Serial::new(
        Path::new("/dev/ttyUSB0"),
        &PortSettings {
            baud_rate: serial_embedded_hal::BaudRate::BaudOther(460800),
            char_size: serial_embedded_hal::CharSize::Bits8,
            parity: serial_embedded_hal::Parity::ParityNone,
            stop_bits: serial_embedded_hal::StopBits::Stop1,
            flow_control: serial_embedded_hal::FlowControl::FlowNone,
        },
    )
    .unwrap();
    let (tx, rx) = serial.split();
    let mut sd = SPIDriver::new(tx, rx);
    sd.unselect().unwrap();
    let eve_interface = eve81x_spidriver::SPIDriverInterface::new(sd);

    // Timings for the common 480x272 panels on EVE dev boards.
    let timings = Timings {
        hcycle: 548,
        hoffset: 43,
        hsync0: 0,
        hsync1: 41,
        vcycle: 292,
        voffset: 12,
        vsync0: 0,
        vsync1: 10,
        width: 480,
        height: 272,
        swizzle: 0,
        pclk_pol: 1,
        cspread: 1,
        dither: 1,
        pclk_div: 5,
    };

    let mut eve = EVE::new(eve_interface);
    eve.start_system_clock(ClockSource::External).unwrap();
    if !eve.poll_for_boot(250).unwrap() {
        eprintln!("EVE chip never booted; check wiring");
        std::process::exit(1);
    }
    println!("EVE chip is booted");
    eve.start_video(&timings).unwrap();

    let mut cp = eve.coprocessor_polling().unwrap();

    println!("Flash status is {:?}", cp.flash_status().unwrap());
    if cp.flash_attach().unwrap() {
        if cp.flash_fast().unwrap() {
            println!("Flash is attached in fast mode");
        } else {
            println!("Flash is attached, but won't enter fast mode");
        }
    } else {
        println!("No flash attached");
    }

    let shape = ScreenShape::from(&timings);
    match eve81x::touch::calibrate(&mut cp, &shape, 10_000_000) {
        Ok(transform) => {
            println!("Touch transform is {:?}", transform.coef);
        }
        Err(e) => {
            eprintln!("Calibration failed: {:?}", e);
            std::process::exit(1);
        }
    }

    cp.start_display_list().unwrap();
    cp.append_display_list(DLCmd::clear_color_rgb(0, 0, 64)).unwrap();
    cp.append_display_list(DLCmd::clear_all()).unwrap();
    cp.cmd_text(240, 136, 30, OPT_CENTER, "Calibrated!").unwrap();
    cp.append_display_list(DLCmd::display()).unwrap();
    cp.display_list_swap().unwrap();
    if let Some(fault) = cp.drain().unwrap() {
        eprintln!("Coprocessor fault: {:?}", fault);
    }
}
