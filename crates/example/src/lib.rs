//! Reference web app stack built with Stratus.
//!
//! Declares a Linux web app running a container, monitored by Application
//! Insights, with a key vault and an Azure SQL database wired to the app's
//! managed identity.
//!
//! # Topology
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Resource group                                               │
//! │                                                               │
//! │  ┌──────────────────────────────┐   ┌──────────┐              │
//! │  │ App service plan             │   │ Log      │              │
//! │  │  ┌────────────────────────┐  │   │ Analytics│◀──┐          │
//! │  │  │ WebAppWithInsights     │  │   └──────────┘   │          │
//! │  │  │  Web app ─▶ Insights ──┼──┼──────────────────┘          │
//! │  │  │   ├ AppSettings        │  │                             │
//! │  │  │   └ ConnectionStrings  │  │                             │
//! │  │  └────────────────────────┘  │                             │
//! │  └──────────────────────────────┘                             │
//! │                                                               │
//! │  ┌────────────┐   ┌────────────────────────────┐              │
//! │  │ Key vault  │   │ SQL server                 │              │
//! │  │ └ Secret   │   │ ├ Database                 │              │
//! │  └────────────┘   │ └ AllowAllWindowsAzureIps  │              │
//! │                   └────────────────────────────┘              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The client configuration lookup and the password generator sit outside
//! the resource group. The key vault name and the database connection string
//! are added to the web app component after it was declared.

pub mod kinds;
pub mod preview;
mod stack;
mod tier;
mod web_app;

pub use preview::preview_engine;
pub use stack::{
    DATABASE_NAME, StackError, StackSettings, WEBSITE_ADDRESS, declare, declare_stack,
};
pub use tier::{PricingTier, UnknownTier};
pub use web_app::{ContainerRegistry, WebAppOutputs, WebAppWithInsights};
