//! Business logic services

pub mod access;
pub mod billing;
pub mod identity;
pub mod invites;
pub mod onboarding;
pub mod payments;
pub mod projects;
pub mod subscription_sync;
pub mod team;

pub use billing::{BillingService, CheckoutOutcome};
pub use identity::{IdentityProvider, LocalIdentityProvider};
pub use invites::InviteService;
pub use onboarding::OnboardingService;
pub use payments::{PaymentProvider, StripeClient};
pub use projects::ProjectService;
pub use subscription_sync::SubscriptionSync;
pub use team::TeamService;
