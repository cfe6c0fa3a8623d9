mod client;
mod filter;
mod phone_number;

pub use client::{Client, ClientId, ClientRecord, ClientUpdate, NewClient, PhoneUpdate};
pub use filter::{ClientFilter, SearchBy};
pub use phone_number::{PhoneId, PhoneNumber};
