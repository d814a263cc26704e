use std::time::Duration;

/// Tunables for one battle. Both peers must agree on the field size and on
/// the card library; everything else is local.
#[derive(Clone, Debug, PartialEq)]
pub struct BattleConfig {
    pub field_width: i32,
    pub field_height: i32,
    pub hand_size: usize,
    /// How long the custom gauge takes to fill during combat.
    pub custom_duration: Duration,
    pub max_hp: i32,
    /// Kick the remote after this long without a packet.
    pub silence_timeout: Duration,
    /// The avatar announced in the connect signal.
    pub navi: u32,
    pub seed: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            field_width: 6,
            field_height: 3,
            hand_size: 5,
            custom_duration: Duration::from_secs(10),
            max_hp: 1000,
            silence_timeout: Duration::from_secs(5),
            navi: 0,
            seed: 0,
        }
    }
}

impl BattleConfig {
    pub fn with_field(mut self, width: i32, height: i32) -> Self {
        self.field_width = width;
        self.field_height = height;
        self
    }

    pub fn with_hand_size(mut self, hand_size: usize) -> Self {
        self.hand_size = hand_size;
        self
    }

    pub fn with_custom_duration(mut self, custom_duration: Duration) -> Self {
        self.custom_duration = custom_duration;
        self
    }

    pub fn with_max_hp(mut self, max_hp: i32) -> Self {
        self.max_hp = max_hp;
        self
    }

    pub fn with_silence_timeout(mut self, silence_timeout: Duration) -> Self {
        self.silence_timeout = silence_timeout;
        self
    }

    pub fn with_navi(mut self, navi: u32) -> Self {
        self.navi = navi;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Link conditions for the simulated network.
#[derive(Clone, Debug, PartialEq)]
pub struct ChaosConfig {
    pub latency: Duration,
    /// Extra delay, picked uniformly from `0..=jitter` per frame.
    pub jitter: Duration,
    /// Chance of losing an unreliable frame, `0.0..=1.0`.
    pub drop_rate: f64,
    pub seed: u64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            drop_rate: 0.0,
            seed: 0,
        }
    }
}

impl ChaosConfig {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_drop_rate(mut self, drop_rate: f64) -> Self {
        self.drop_rate = drop_rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
