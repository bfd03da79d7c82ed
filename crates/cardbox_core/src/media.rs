//! Media subsystem lifecycle handle.
//!
//! The collection only drives connect/close; file storage itself is an
//! external concern.

use log::info;

/// Lifecycle handle for the external media subsystem.
#[derive(Debug, Default)]
pub struct MediaHandle {
    connected: bool,
}

impl MediaHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self) {
        if !self.connected {
            self.connected = true;
            info!("event=media_connect module=media status=ok");
        }
    }

    pub fn close(&mut self) {
        if self.connected {
            self.connected = false;
            info!("event=media_close module=media status=ok");
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::MediaHandle;

    #[test]
    fn connect_close_lifecycle() {
        let mut media = MediaHandle::new();
        assert!(!media.connected());
        media.connect();
        assert!(media.connected());
        media.close();
        assert!(!media.connected());
    }
}
