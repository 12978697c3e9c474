pub mod payouts;
pub mod reconciler;
pub mod refunds;
pub mod reservation;
pub mod verification;

pub use payouts::PayoutScheduler;
pub use reconciler::{PaymentEventType, PaymentNotification, PaymentReconciler, ReconcileOutcome};
pub use refunds::RefundService;
pub use reservation::{ReservationService, ReserveRequest};
pub use verification::{CheckInRequest, VerificationOutcome, VerificationService};
