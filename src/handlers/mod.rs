// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Onboarding (JWT auth, no family yet) → Protected (JWT auth + family)
//
pub mod public;     // Tier 1: No authentication required
pub mod onboarding; // Tier 2: JWT authentication required, family optional
pub mod protected;  // Tier 3: JWT authentication and a resolved family required
