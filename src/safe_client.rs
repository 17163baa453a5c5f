//! Thread-safe Cryo-con client.
//!
//! The wire protocol has no request identifiers, so one connection must never
//! carry two requests at a time. [`SafeClient`] puts the [`CryoCon`] behind a
//! mutex: every method, and every closure passed to [`SafeClient::with`],
//! holds the lock for its whole exchange, batches included.
//!
//! ## Example
//!
//! ```no_run
//! use cryocon_lib::{
//!     connection::{self, ConnectionUrl},
//!     protocol as proto,
//!     safe_client::SafeClient,
//! };
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url: ConnectionUrl = "tcp://192.168.1.20".parse()?;
//!     let transport = connection::open(&url, Duration::from_secs(1), proto::DEFAULT_BAUD_RATE)?;
//!     let client = SafeClient::new(transport);
//!
//!     let poller = client.clone();
//!     std::thread::spawn(move || {
//!         let _ = poller.idn();
//!     });
//!
//!     println!("Control running: {}", client.control()?);
//!     Ok(())
//! }
//! ```

use crate::{
    attribute::Attribute,
    batch::Batch,
    client::{CryoCon, Status},
    codec::Value,
    error::Result,
    transport::Transport,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shareable client for one Cryo-con temperature controller.
#[derive(Debug)]
pub struct SafeClient<T: Transport> {
    ctrl: Arc<Mutex<CryoCon<T>>>,
}

impl<T: Transport> Clone for SafeClient<T> {
    fn clone(&self) -> Self {
        Self {
            ctrl: self.ctrl.clone(),
        }
    }
}

impl<T: Transport> SafeClient<T> {
    /// Creates a new `SafeClient` managing all channels and loops.
    pub fn new(transport: T) -> Self {
        Self::from_client(CryoCon::new(transport))
    }

    /// Creates a new `SafeClient` from a configured client.
    pub fn from_client(ctrl: CryoCon<T>) -> Self {
        Self {
            ctrl: Arc::new(Mutex::new(ctrl)),
        }
    }

    /// Creates a new `SafeClient` from a shared client.
    pub fn from_shared(ctrl: Arc<Mutex<CryoCon<T>>>) -> Self {
        Self { ctrl }
    }

    /// Clones the shared client.
    pub fn clone_shared(&self) -> Arc<Mutex<CryoCon<T>>> {
        self.ctrl.clone()
    }

    fn lock(&self) -> MutexGuard<'_, CryoCon<T>> {
        self.ctrl.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the client.
    pub fn with<R>(&self, f: impl FnOnce(&mut CryoCon<T>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn get(&self, attribute: Attribute) -> Result<Value> {
        self.lock().get(attribute)
    }

    pub fn set(&self, attribute: Attribute, value: &Value) -> Result<()> {
        self.lock().set(attribute, value)
    }

    pub fn read_attributes(&self, attributes: &[Attribute]) -> Result<Vec<(Attribute, Value)>> {
        self.lock().read_attributes(attributes)
    }

    pub fn batch<F>(&self, fill: F) -> Result<Vec<Value>>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        self.lock().batch(fill)
    }

    pub fn run(&self, request: &str) -> Result<String> {
        self.lock().run(request)
    }

    pub fn idn(&self) -> Result<String> {
        self.lock().idn()
    }

    pub fn control(&self) -> Result<bool> {
        self.lock().control()
    }

    pub fn status(&self) -> Result<Status> {
        self.lock().status()
    }

    pub fn on(&self) -> Result<()> {
        self.lock().on()
    }

    pub fn off(&self) -> Result<()> {
        self.lock().off()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::protocol::ChannelId;

    #[test]
    fn shared_between_threads() {
        let client = SafeClient::new(MockTransport::new().reply("Cryo-con").reply("4.2"));
        let other = client.clone();
        let idn = std::thread::spawn(move || other.idn().unwrap())
            .join()
            .unwrap();
        assert_eq!(idn, "Cryo-con");

        let temperature = client
            .with(|ctrl| ctrl.channel(ChannelId::A)?.temperature())
            .unwrap();
        assert_eq!(temperature, Some(4.2));
        assert_eq!(client.clone_shared().lock().unwrap().transport().requests.len(), 2);
    }

    #[test]
    fn recovers_from_poisoning() {
        let client = SafeClient::new(MockTransport::new().reply("ON"));
        let shared = client.clone_shared();
        let _ = std::thread::spawn(move || {
            let _guard = shared.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(client.control().unwrap());
    }
}
