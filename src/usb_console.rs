//! USB Console Module
//!
//! USB CDC serial port that mirrors the status text for a host terminal.
//! The device is serviced from the `USBCTRL_IRQ` interrupt so enumeration
//! keeps working while the game loop runs flat out.

use core::cell::RefCell;
use critical_section::Mutex;
use static_cell::StaticCell;
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

use rp235x_hal as hal;
use hal::pac;

use rp235x_hal::pac::interrupt;

type UsbBusType = hal::usb::UsbBus;

// Global USB Objects (Mutex protected for ISR access)
static USB_DEVICE: Mutex<RefCell<Option<UsbDevice<UsbBusType>>>> = Mutex::new(RefCell::new(None));
static USB_SERIAL: Mutex<RefCell<Option<SerialPort<UsbBusType>>>> = Mutex::new(RefCell::new(None));

/// Initialize USB Serial and enable the USB interrupt.
pub fn init(
    usb_periph: pac::USB,
    usb_dpram: pac::USB_DPRAM,
    usb_clock: hal::clocks::UsbClock,
    resets: &mut pac::RESETS,
) {
    let usb_bus = hal::usb::UsbBus::new(
        usb_periph,
        usb_dpram,
        usb_clock,
        true,
        resets,
    );

    static USB_BUS: StaticCell<UsbBusAllocator<UsbBusType>> = StaticCell::new();
    let bus_allocator: &'static _ = USB_BUS.init(UsbBusAllocator::new(usb_bus));

    let serial = SerialPort::new(bus_allocator);
    let usb_dev = UsbDeviceBuilder::new(bus_allocator, UsbVidPid(0x16c0, 0x27dd))
        .strings(&[StringDescriptors::default()
            .manufacturer("Cadet Pinball")
            .product("Display Controller")
            .serial_number("CADET01")])
        .unwrap()
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build();

    critical_section::with(|cs| {
        USB_DEVICE.borrow_ref_mut(cs).replace(usb_dev);
        USB_SERIAL.borrow_ref_mut(cs).replace(serial);
    });

    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
    }
}

/// Writes `text` as one console line. Embedded newlines become spaces so
/// each status message stays on a single terminal line. Dropped if no host
/// is listening.
pub fn write_line(text: &str) {
    critical_section::with(|cs| {
        let mut serial = USB_SERIAL.borrow_ref_mut(cs);
        if let Some(serial) = serial.as_mut() {
            for (i, chunk) in text.split('\n').enumerate() {
                if i > 0 {
                    let _ = serial.write(b" ");
                }
                let _ = serial.write(chunk.as_bytes());
            }
            let _ = serial.write(b"\r\n");
        }
    });
}

#[allow(non_snake_case)]
#[interrupt]
fn USBCTRL_IRQ() {
    critical_section::with(|cs| {
        let mut dev = USB_DEVICE.borrow_ref_mut(cs);
        let mut serial = USB_SERIAL.borrow_ref_mut(cs);

        if let (Some(dev), Some(serial)) = (dev.as_mut(), serial.as_mut()) {
            if dev.poll(&mut [serial]) {
                // Console is output only; discard whatever the host sends.
                let mut buf = [0u8; 64];
                let _ = serial.read(&mut buf);
            }
        }
    });
}
