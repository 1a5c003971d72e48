//! Domain events consumed by the adapter layer.
//!
//! Each event is one occurrence on the host page: an interaction, a browser
//! observation, or an application-level funnel signal. Adapters map these
//! deterministically to queued operations; events never carry rendering
//! concerns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Funnel stages emitted by the storefront UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunnelStage {
    /// Product quick-view modal opened (deep checkout intent).
    ModalOpen,
    /// Variant selector touched inside the modal.
    VariantSelect,
    /// Checkout button clicked.
    CheckoutClick,
}

impl FunnelStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModalOpen => "modal-open",
            Self::VariantSelect => "variant-select",
            Self::CheckoutClick => "checkout-click",
        }
    }
}

/// Newsletter prompt lifecycle stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterStage {
    Shown,
    Signup,
    Dismiss,
}

impl NewsletterStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shown => "shown",
            Self::Signup => "signup",
            Self::Dismiss => "dismiss",
        }
    }
}

/// One occurrence on the host page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A page finished loading.
    PageView,

    /// A product detail surface was viewed.
    ProductView { handle: String },

    /// A pointer click at viewport coordinates.
    Click { x: f64, y: f64 },

    /// A scroll position sample (pre-debounce).
    Scroll {
        scroll_top: f64,
        document_height: f64,
        viewport_height: f64,
    },

    /// A storefront funnel stage fired.
    Funnel {
        stage: FunnelStage,
        handle: String,
    },

    /// Newsletter prompt interaction.
    Newsletter {
        stage: NewsletterStage,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    /// A cart mutation observed on the page.
    Cart {
        action: String,
        handle: String,
        quantity: u32,
    },

    /// One performance observation (navigation timing, LCP, ...).
    Performance { metric: String, value: f64 },

    /// An uncaught script error or unhandled rejection.
    PageError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
    },

    /// A caller-defined event routed through `track`.
    Custom {
        name: String,
        #[serde(default)]
        data: Map<String, Value>,
    },
}
