//! Environment abstraction for deterministic testing.
//!
//! Decouples the stack from system resources (time, randomness). Enables
//! deterministic simulation in someip-harness and production use with real
//! system resources.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single execution context.
/// - `random_bytes()` uses cryptographically secure entropy in production.
/// - `wall_clock_ms()` is used only for E2E freshness (§4.4); it need not be
///   wall-clock accurate in simulation, only monotonic.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment. Production
    /// environments use `std::time::Instant`; simulation environments use
    /// virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic), used for TP reassembly timeouts and SD
    /// phase scheduling.
    fn now(&self) -> Self::Instant;

    /// Sleeps for `duration`. The only async method in the trait; only
    /// driver code should call it, never the state machines themselves.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills `buffer` with random bytes (session ids, client ids).
    fn random_bytes(&self, buffer: &mut [u8]);

    /// A random `u16`, convenient for SOME/IP Session IDs and Client IDs.
    fn random_u16(&self) -> u16 {
        let mut bytes = [0u8; 2];
        self.random_bytes(&mut bytes);
        u16::from_be_bytes(bytes)
    }

    /// Milliseconds since an arbitrary monotonic epoch, fed to
    /// [`someip_e2e::Profile::protect`]/`validate` as the freshness clock
    /// (§4.4). Production environments derive this from the system clock;
    /// simulation environments derive it from virtual time.
    fn wall_clock_ms(&self) -> u64;
}

/// Production environment using system time, the OS RNG, and tokio sleep.
#[derive(Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Creates a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable, stack cannot assign session ids");
    }

    #[allow(clippy::disallowed_methods, clippy::expect_used)]
    fn wall_clock_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after the Unix epoch")
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn system_env_time_advances() {
        let env = SystemEnv::new();
        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();
        assert!(t2 > t1);
    }

    #[test]
    fn system_env_random_bytes_fill_buffer() {
        let env = SystemEnv::new();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);
        assert_ne!(a, b);
    }
}
