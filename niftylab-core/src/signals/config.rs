//! Strategy configuration: the serializable description of one strategy
//! instance, and the factory that turns it into a `SignalGenerator`.
//!
//! Configs come from TOML run files (`type = "ma_crossover"`) and are hashed
//! for result identity. Construction validates every parameter, so a bad
//! config is rejected before a single bar is processed.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::{
    BollingerBreakout, MaCrossover, MacdSignal, Momentum, RsiReversion, SignalGenerator,
};

// ─── Defaults ────────────────────────────────────────────────────────

fn default_ma_fast() -> usize {
    10
}
fn default_ma_slow() -> usize {
    50
}
fn default_rsi_window() -> usize {
    14
}
fn default_oversold() -> f64 {
    30.0
}
fn default_overbought() -> f64 {
    70.0
}
fn default_bb_window() -> usize {
    20
}
fn default_bb_k() -> f64 {
    2.0
}
fn default_macd_fast() -> usize {
    12
}
fn default_macd_slow() -> usize {
    26
}
fn default_macd_signal() -> usize {
    9
}
fn default_momentum_window() -> usize {
    12
}

// ─── Config ──────────────────────────────────────────────────────────

/// One strategy with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    MaCrossover {
        #[serde(default = "default_ma_fast")]
        fast: usize,
        #[serde(default = "default_ma_slow")]
        slow: usize,
    },
    RsiReversion {
        #[serde(default = "default_rsi_window")]
        window: usize,
        #[serde(default = "default_oversold")]
        oversold: f64,
        #[serde(default = "default_overbought")]
        overbought: f64,
    },
    BollingerBreakout {
        #[serde(default = "default_bb_window")]
        window: usize,
        #[serde(default = "default_bb_k")]
        k: f64,
    },
    MacdSignal {
        #[serde(default = "default_macd_fast")]
        fast: usize,
        #[serde(default = "default_macd_slow")]
        slow: usize,
        #[serde(default = "default_macd_signal")]
        signal: usize,
    },
    Momentum {
        #[serde(default = "default_momentum_window")]
        window: usize,
    },
}

impl StrategyConfig {
    /// The five strategies with their default parameters.
    pub fn default_set() -> Vec<StrategyConfig> {
        vec![
            StrategyConfig::MaCrossover {
                fast: default_ma_fast(),
                slow: default_ma_slow(),
            },
            StrategyConfig::RsiReversion {
                window: default_rsi_window(),
                oversold: default_oversold(),
                overbought: default_overbought(),
            },
            StrategyConfig::BollingerBreakout {
                window: default_bb_window(),
                k: default_bb_k(),
            },
            StrategyConfig::MacdSignal {
                fast: default_macd_fast(),
                slow: default_macd_slow(),
                signal: default_macd_signal(),
            },
            StrategyConfig::Momentum {
                window: default_momentum_window(),
            },
        ]
    }

    /// Stable type identifier, matching `SignalGenerator::name`.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::MaCrossover { .. } => "ma_crossover",
            StrategyConfig::RsiReversion { .. } => "rsi_reversion",
            StrategyConfig::BollingerBreakout { .. } => "bollinger_breakout",
            StrategyConfig::MacdSignal { .. } => "macd_signal",
            StrategyConfig::Momentum { .. } => "momentum",
        }
    }

    /// Human-readable label including parameters, e.g. `MA(10,50)`.
    pub fn label(&self) -> String {
        match self {
            StrategyConfig::MaCrossover { fast, slow } => format!("MA({fast},{slow})"),
            StrategyConfig::RsiReversion {
                window,
                oversold,
                overbought,
            } => format!("RSI({window},{oversold},{overbought})"),
            StrategyConfig::BollingerBreakout { window, k } => format!("BB({window},{k})"),
            StrategyConfig::MacdSignal { fast, slow, signal } => {
                format!("MACD({fast},{slow},{signal})")
            }
            StrategyConfig::Momentum { window } => format!("MOM({window})"),
        }
    }

    /// Check parameters without keeping the generator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    /// Construct the signal generator this config describes.
    pub fn build(&self) -> Result<Box<dyn SignalGenerator>, ConfigError> {
        Ok(match *self {
            StrategyConfig::MaCrossover { fast, slow } => Box::new(MaCrossover::new(fast, slow)?),
            StrategyConfig::RsiReversion {
                window,
                oversold,
                overbought,
            } => Box::new(RsiReversion::new(window, oversold, overbought)?),
            StrategyConfig::BollingerBreakout { window, k } => {
                Box::new(BollingerBreakout::new(window, k)?)
            }
            StrategyConfig::MacdSignal { fast, slow, signal } => {
                Box::new(MacdSignal::new(fast, slow, signal)?)
            }
            StrategyConfig::Momentum { window } => Box::new(Momentum::new(window)?),
        })
    }

    /// Shortest series this strategy can produce a defined signal on.
    pub fn warmup_bars(&self) -> usize {
        match *self {
            StrategyConfig::MaCrossover { slow, .. } => slow + 1,
            StrategyConfig::RsiReversion { window, .. }
            | StrategyConfig::BollingerBreakout { window, .. }
            | StrategyConfig::Momentum { window } => window + 1,
            StrategyConfig::MacdSignal { slow, signal, .. } => {
                (slow + 1).max((slow + signal).saturating_sub(1))
            }
        }
    }

    /// Content hash of the config: blake3 over its canonical JSON.
    ///
    /// Identical parameters give identical fingerprints across runs and
    /// machines.
    pub fn fingerprint(&self) -> String {
        // Enum variants with plain fields always serialize.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_tag_selects_variant_and_fills_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategies: Vec<StrategyConfig>,
        }
        let text = r#"
            [[strategies]]
            type = "ma_crossover"
            fast = 5
            slow = 20

            [[strategies]]
            type = "macd_signal"
        "#;
        let parsed: Wrapper = toml::from_str(text).unwrap();
        assert_eq!(
            parsed.strategies[0],
            StrategyConfig::MaCrossover { fast: 5, slow: 20 }
        );
        assert_eq!(
            parsed.strategies[1],
            StrategyConfig::MacdSignal {
                fast: 12,
                slow: 26,
                signal: 9
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<StrategyConfig, _> = serde_json::from_str(r#"{"type":"turtle"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn labels_and_names() {
        let cfg = StrategyConfig::MaCrossover { fast: 5, slow: 20 };
        assert_eq!(cfg.label(), "MA(5,20)");
        assert_eq!(cfg.name(), "ma_crossover");
        let cfg = StrategyConfig::BollingerBreakout { window: 20, k: 2.5 };
        assert_eq!(cfg.label(), "BB(20,2.5)");
    }

    #[test]
    fn built_generator_agrees_with_config() {
        for cfg in StrategyConfig::default_set() {
            let generator = cfg.build().unwrap();
            assert_eq!(generator.name(), cfg.name());
            assert_eq!(generator.min_bars(), cfg.warmup_bars());
        }
    }

    #[test]
    fn validate_reports_bad_parameters() {
        let cfg = StrategyConfig::MaCrossover { fast: 50, slow: 10 };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidParameter { name: "fast", .. })
        ));
        let cfg = StrategyConfig::Momentum { window: 0 };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositiveWindow { name: "window" })
        );
    }

    #[test]
    fn fingerprint_tracks_parameters() {
        let a = StrategyConfig::Momentum { window: 12 };
        let b = StrategyConfig::Momentum { window: 12 };
        let c = StrategyConfig::Momentum { window: 13 };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
