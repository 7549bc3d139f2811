// handlers/mod.rs - Three-tier handler layout
//
// Public (no session) → Protected (session cookie) → Admin (session + admin role)

pub mod admin;
pub mod protected;
pub mod public;
