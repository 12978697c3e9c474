pub mod event;
pub mod payout;
pub mod template;
pub mod ticket;

pub use event::Event;
pub use payout::{Payout, PayoutStatus};
pub use template::{TicketKind, TicketTemplate};
pub use ticket::{PaymentStatus, Ticket, TicketStatus};
