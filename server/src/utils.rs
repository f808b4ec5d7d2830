use rand::Rng;

/// Monotonic counter handing out numeric ids.
///
/// Owned by whichever component needs ids, so a fresh generator can be
/// injected in tests instead of relying on process-wide state.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Generates connection ids of the form `<instance>:<counter>`.
///
/// The instance tag helps tell deployed server instances apart in logs and
/// client reports. It is not a security boundary.
#[derive(Debug, Clone)]
pub struct ClientIdGenerator {
    instance: String,
    counter: IdGenerator,
}

impl ClientIdGenerator {
    /// Uses a random three digit instance tag
    pub fn new() -> Self {
        Self::with_instance(random_instance_tag(&mut rand::thread_rng()))
    }

    pub fn with_instance(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            counter: IdGenerator::new(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn next_id(&mut self) -> String {
        format!("{}:{}", self.instance, self.counter.next_id())
    }
}

impl Default for ClientIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn random_instance_tag<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:03}", rng.gen_range(0..1000))
}

/// Random CSS hex color, always six digits
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06x}", rng.gen_range(0..=0xff_ffffu32))
}

/// Random multiple of `step` in `[0, max]`
pub fn random_grid_coordinate<R: Rng + ?Sized>(rng: &mut R, max: u32, step: u32) -> u32 {
    let step = step.max(1);
    rng.gen_range(0..=max / step) * step
}
