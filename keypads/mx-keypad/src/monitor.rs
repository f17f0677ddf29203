//! Blocking read-and-decode loop for one device.
//!
//! The loop owns its own read handle and the device's press state. It waits
//! for input with a bounded poll timeout so a stop request is noticed
//! promptly even when no reports arrive, reads one report at a time, and
//! hands every decoded event to the registered callback in order.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mx_console_core::EventCallback;
use tracing::{debug, warn};

use crate::input::{decode_report, PressState};

/// Largest inbound report this device emits.
const REPORT_CAP: usize = 256;
/// Poll timeout; bounds how long a stop request can go unnoticed.
const POLL_TIMEOUT_MS: libc::c_int = 100;

pub struct Monitor {
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the loop on its own thread. No-op when already running.
    pub fn start(&mut self, path: PathBuf, callback: EventCallback) {
        if self.is_running() {
            return;
        }
        self.running.store(true, Ordering::Relaxed);

        let running = Arc::clone(&self.running);
        self.task = Some(thread::spawn(move || {
            match open_for_reading(&path) {
                Ok(file) => {
                    debug!(path = %path.display(), "monitor loop started");
                    if let Err(err) = run(file, &callback, &running) {
                        warn!(%err, path = %path.display(), "monitor loop failed");
                    }
                }
                Err(err) => {
                    warn!(%err, path = %path.display(), "failed to open device for monitoring")
                }
            }
            running.store(false, Ordering::Relaxed);
        }));
    }

    /// Signal the loop and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            let _ = task.join();
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

fn open_for_reading(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

fn run(mut file: File, callback: &EventCallback, running: &AtomicBool) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let mut state = PressState::default();
    let mut report = [0u8; REPORT_CAP];

    while running.load(Ordering::Relaxed) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut pfd, 1, POLL_TIMEOUT_MS) };
        if ready < 0 {
            return Err(io::Error::last_os_error());
        }
        if ready == 0 || pfd.revents & libc::POLLIN == 0 {
            continue;
        }

        match file.read(&mut report) {
            Ok(0) => continue,
            Ok(len) => {
                for event in decode_report(&report[..len], &mut state) {
                    (*callback)(&event);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::fd::FromRawFd;
    use std::sync::Mutex;
    use std::time::Duration;

    use mx_console_core::Event;

    use super::*;

    /// Pipe pair as (read File, write File).
    fn pipe() -> (File, File) {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) }
    }

    fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached in time");
    }

    #[test]
    fn delivers_events_in_order_and_stops() {
        let (read_end, mut write_end) = pipe();

        let seen: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: EventCallback = Arc::new(move |event| {
            sink.lock().unwrap().push(*event);
        });

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let task = thread::spawn(move || run(read_end, &callback, &flag));

        use std::io::Write;
        // grid snapshot: keys 1 and 2 down
        write_end
            .write_all(&[0x13, 0xff, 0x02, 0x00, 0x00, 0x01, 0x01, 0x02, 0x00])
            .unwrap();
        wait_for(|| seen.lock().unwrap().len() == 2);

        // noise report: no event; give the loop time to consume it so the
        // pipe doesn't coalesce it with the next report
        write_end.write_all(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
        thread::sleep(Duration::from_millis(50));
        // navigation press
        write_end
            .write_all(&[0x11, 0xff, 0x0b, 0x00, 0x01, 0xa1])
            .unwrap();
        wait_for(|| seen.lock().unwrap().len() == 3);

        let codes: Vec<(u8, bool)> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| match e {
                Event::Button(b) => (b.code, b.pressed),
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(codes, vec![(0, true), (1, true), (0xa1, true)]);

        running.store(false, Ordering::Relaxed);
        task.join().unwrap().unwrap();
    }

    #[test]
    fn stop_returns_promptly_without_input() {
        let (read_end, _write_end) = pipe();
        let callback: EventCallback = Arc::new(|_| {});

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let task = thread::spawn(move || run(read_end, &callback, &flag));

        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Relaxed);
        // bounded poll timeout means the join cannot hang
        task.join().unwrap().unwrap();
    }

    #[test]
    fn start_refuses_missing_device() {
        let mut monitor = Monitor::new();
        monitor.start(PathBuf::from("/nonexistent/hidraw"), Arc::new(|_| {}));
        wait_for(|| !monitor.is_running());
        monitor.stop();
    }
}
