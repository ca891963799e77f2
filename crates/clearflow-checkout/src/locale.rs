//! Locale and Text Direction
//!
//! The site ships in English and Arabic. The active locale is a single
//! process-wide value with one write operation ([`LocaleToggle::toggle`]).
//! The checkout flow never reads it; shells pass the resulting
//! [`TextDirection`] into [`crate::CheckoutFlow::view`] as a layout hint.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{CheckoutError, Result};

/// Supported site languages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    /// BCP 47 language tag
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    pub const fn direction(&self) -> TextDirection {
        match self {
            Self::En => TextDirection::Ltr,
            Self::Ar => TextDirection::Rtl,
        }
    }

    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::En => Self::Ar,
            Self::Ar => Self::En,
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            other => Err(CheckoutError::Config(format!("unsupported locale: {other}"))),
        }
    }
}

/// Layout direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub const fn is_rtl(&self) -> bool {
        matches!(self, Self::Rtl)
    }
}

/// Process-wide locale setting
///
/// Readers call [`current`](Self::current) or hold a receiver from
/// [`subscribe`](Self::subscribe); the only writer is [`toggle`](Self::toggle).
#[derive(Debug)]
pub struct LocaleToggle {
    tx: watch::Sender<Locale>,
}

impl LocaleToggle {
    pub fn new(initial: Locale) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Locale {
        *self.tx.borrow()
    }

    pub fn direction(&self) -> TextDirection {
        self.current().direction()
    }

    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.tx.subscribe()
    }

    /// Flip between English and Arabic, returning the new locale
    pub fn toggle(&self) -> Locale {
        self.tx.send_modify(|locale| *locale = locale.toggled());
        let locale = self.current();
        tracing::info!(locale = locale.tag(), "Locale switched");
        locale
    }
}

impl Default for LocaleToggle {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}
