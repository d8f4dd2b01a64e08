//! The coaching evaluation pipeline.
//!
//! ## Per-Sample Processing Sequence
//!
//! ```text
//! STEP 1: Session gate check (closed -> drop, counted)
//! STEP 2: Sanity filter (validate / derive channels, reject with reason)
//! STEP 3: Track projection (GPS -> progress s, lateral offset d)
//! STEP 4: Zone assignment (Turn > StopApproach > Straight, half-open)
//! STEP 5: Zone profile lookup (confidence-gated)
//! STEP 6: State evaluation (normalized deviation -> green/red)
//! STEP 7: Cue stabilization (hysteresis + debounce + cooldown)
//! ```
//!
//! Steps 2-7 are synchronous and allocation-light; the only suspension
//! points live in the processing loop at the transport boundary. Samples are
//! processed strictly in arrival order because the stabilizer's debounce and
//! cooldown logic depends on consecutive-sample semantics.

mod evaluator;
mod gate;
mod pipeline;
pub mod processing_loop;
mod sanity;
mod stabilizer;

pub use evaluator::StateEvaluator;
pub use gate::SessionGate;
pub use pipeline::CoachPipeline;
pub use processing_loop::{CoachState, ProcessingLoop};
pub use sanity::SanityFilter;
pub use stabilizer::CueStabilizer;
