use super::uinput_ffi::*;
use super::{buttons, GamepadReport, VirtualController};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;

/// Report bit -> uinput key code, for everything except the D-pad
const KEY_CODES: [(u16, u16); 10] = [
    (buttons::A, BTN_A),
    (buttons::B, BTN_B),
    (buttons::X, BTN_X),
    (buttons::Y, BTN_Y),
    (buttons::LEFT_SHOULDER, BTN_TL),
    (buttons::RIGHT_SHOULDER, BTN_TR),
    (buttons::BACK, BTN_SELECT),
    (buttons::START, BTN_START),
    (buttons::LEFT_THUMB, BTN_THUMBL),
    (buttons::RIGHT_THUMB, BTN_THUMBR),
];

pub struct VirtualXboxController {
    index: usize,
    uinput_file: Option<File>,
    connected: bool,
}

impl VirtualXboxController {
    pub fn new(index: usize) -> anyhow::Result<Self> {
        let mut controller = Self {
            index,
            uinput_file: None,
            connected: false,
        };

        controller.connect()?;
        Ok(controller)
    }

    fn connect(&mut self) -> anyhow::Result<()> {
        let uinput_file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(UINPUT_PATH)
            .map_err(|e| anyhow::anyhow!(
                "Failed to open {}: {}. Try: sudo chmod 666 /dev/uinput",
                UINPUT_PATH, e
            ))?;

        let uinput_fd = uinput_file.as_raw_fd();

        unsafe {
            // Enable event types
            for ev in [EV_KEY, EV_ABS, EV_SYN] {
                if libc::ioctl(uinput_fd, UI_SET_EVBIT, ev as libc::c_int) < 0 {
                    return Err(anyhow::anyhow!("Failed to set event type {}", ev));
                }
            }

            // Set buttons
            for (_, btn) in KEY_CODES {
                if libc::ioctl(uinput_fd, UI_SET_KEYBIT, btn as libc::c_int) < 0 {
                    return Err(anyhow::anyhow!("Failed to set button {}", btn));
                }
            }

            // Set absolute axes
            for axis in [ABS_X, ABS_Y, ABS_RX, ABS_RY, ABS_Z, ABS_RZ, ABS_HAT0X, ABS_HAT0Y] {
                if libc::ioctl(uinput_fd, UI_SET_ABSBIT, axis as libc::c_int) < 0 {
                    return Err(anyhow::anyhow!("Failed to set axis {}", axis));
                }
            }

            // Create device struct
            let mut dev: UinputUserDev = std::mem::zeroed();
            let name = format!("Padbridge Virtual Xbox Controller {}", self.index + 1);
            let name = name.as_bytes();
            let len = name.len().min(dev.name.len() - 1);
            dev.name[..len].copy_from_slice(&name[..len]);
            dev.id.bustype = 0x03; // BUS_USB
            dev.id.vendor = 0x045e; // Microsoft
            dev.id.product = 0x028e; // Xbox 360 Controller
            dev.id.version = 0x0110;

            // Set axis ranges
            for axis in [ABS_X, ABS_Y, ABS_RX, ABS_RY] {
                dev.absmin[axis as usize] = AXIS_MIN;
                dev.absmax[axis as usize] = AXIS_MAX;
            }
            for axis in [ABS_Z, ABS_RZ] {
                dev.absmin[axis as usize] = TRIGGER_MIN;
                dev.absmax[axis as usize] = TRIGGER_MAX;
            }
            for axis in [ABS_HAT0X, ABS_HAT0Y] {
                dev.absmin[axis as usize] = -1;
                dev.absmax[axis as usize] = 1;
            }

            // Write device struct
            let dev_bytes = std::slice::from_raw_parts(
                &dev as *const _ as *const u8,
                std::mem::size_of::<UinputUserDev>()
            );

            if libc::write(uinput_fd, dev_bytes.as_ptr() as *const libc::c_void, dev_bytes.len()) < 0 {
                return Err(anyhow::anyhow!("Failed to write device struct"));
            }

            // Create device
            if libc::ioctl(uinput_fd, UI_DEV_CREATE) < 0 {
                return Err(anyhow::anyhow!("Failed to create device: {}", std::io::Error::last_os_error()));
            }
        }

        self.uinput_file = Some(uinput_file);
        self.connected = true;

        log::info!("Uinput gamepad {} created", self.index);

        Ok(())
    }

    fn write_event(&mut self, type_: u16, code: u16, value: i32) -> anyhow::Result<()> {
        if let Some(ref mut file) = self.uinput_file {
            let event = InputEvent::new(type_, code, value);
            let bytes = unsafe {
                std::slice::from_raw_parts(
                    &event as *const _ as *const u8,
                    std::mem::size_of::<InputEvent>()
                )
            };
            file.write_all(bytes)?;
        }
        Ok(())
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        self.write_event(EV_SYN, SYN_REPORT, 0)?;
        if let Some(ref mut file) = self.uinput_file {
            file.flush()?;
        }
        Ok(())
    }
}

/// Collapse a pair of opposing D-pad bits into one hat axis value
fn hat_axis(report: &GamepadReport, negative: u16, positive: u16) -> i32 {
    match (report.is_pressed(negative), report.is_pressed(positive)) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

impl Drop for VirtualXboxController {
    fn drop(&mut self) {
        if let Some(ref file) = self.uinput_file {
            unsafe {
                let _ = libc::ioctl(file.as_raw_fd(), UI_DEV_DESTROY);
            }
        }
    }
}

impl VirtualController for VirtualXboxController {
    fn update(&mut self, report: &GamepadReport) -> anyhow::Result<()> {
        // evdev Y axes point down, XInput Y axes point up
        self.write_event(EV_ABS, ABS_X, report.thumb_lx as i32)?;
        self.write_event(EV_ABS, ABS_Y, -(report.thumb_ly as i32))?;
        self.write_event(EV_ABS, ABS_RX, report.thumb_rx as i32)?;
        self.write_event(EV_ABS, ABS_RY, -(report.thumb_ry as i32))?;
        self.write_event(EV_ABS, ABS_Z, report.left_trigger as i32)?;
        self.write_event(EV_ABS, ABS_RZ, report.right_trigger as i32)?;

        for (bit, code) in KEY_CODES {
            self.write_event(EV_KEY, code, report.is_pressed(bit) as i32)?;
        }

        let hat_x = hat_axis(report, buttons::DPAD_LEFT, buttons::DPAD_RIGHT);
        let hat_y = hat_axis(report, buttons::DPAD_UP, buttons::DPAD_DOWN);
        self.write_event(EV_ABS, ABS_HAT0X, hat_x)?;
        self.write_event(EV_ABS, ABS_HAT0Y, hat_y)?;

        // One SYN_REPORT per snapshot so readers never see half an update
        self.sync()?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
