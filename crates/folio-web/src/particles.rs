#![forbid(unsafe_code)]

//! Decorative particles for the hero section.
//!
//! Positions and timings come from a seeded xorshift64 generator so a given
//! seed always produces the same layout.

use crate::dom::{Document, NodeId};

const CONTAINER_STYLE: [(&str, &str); 7] = [
    ("position", "absolute"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
    ("pointer-events", "none"),
    ("z-index", "-1"),
];

const PARTICLE_STYLE: [(&str, &str); 5] = [
    ("position", "absolute"),
    ("width", "2px"),
    ("height", "2px"),
    ("background", "rgba(139, 92, 246, 0.3)"),
    ("border-radius", "50%"),
];

/// Deterministic uniform source in `[0, 1)`.
#[derive(Debug, Clone)]
struct Xorshift64(u64);

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(seed.wrapping_add(1).max(1))
    }

    fn next_unit(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Randomized parameters of one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpec {
    /// Float animation period, seconds in `[3, 7)`.
    pub duration_s: f64,
    /// Animation delay, seconds in `[0, 2)`.
    pub delay_s: f64,
    /// Horizontal position, percent of the container in `[0, 100)`.
    pub left_pct: f64,
    /// Vertical position, percent of the container in `[0, 100)`.
    pub top_pct: f64,
}

impl ParticleSpec {
    /// Inline style declarations for this particle.
    #[must_use]
    pub fn styles(&self) -> Vec<(&'static str, String)> {
        let mut styles: Vec<(&'static str, String)> = PARTICLE_STYLE
            .iter()
            .map(|&(prop, value)| (prop, value.to_owned()))
            .collect();
        styles.push((
            "animation",
            format!("float {:.3}s ease-in-out infinite", self.duration_s),
        ));
        styles.push(("animation-delay", format!("{:.3}s", self.delay_s)));
        styles.push(("left", format!("{:.3}%", self.left_pct)));
        styles.push(("top", format!("{:.3}%", self.top_pct)));
        styles
    }
}

/// `count` particle specs drawn from `seed`.
#[must_use]
pub fn particle_specs(count: usize, seed: u64) -> Vec<ParticleSpec> {
    let mut rng = Xorshift64::new(seed);
    (0..count)
        .map(|_| ParticleSpec {
            duration_s: 3.0 + rng.next_unit() * 4.0,
            delay_s: rng.next_unit() * 2.0,
            left_pct: rng.next_unit() * 100.0,
            top_pct: rng.next_unit() * 100.0,
        })
        .collect()
}

/// Build a `particles-container` holding `count` particles and append it
/// to `hero`. Returns the container.
pub fn inject_particles<D: Document + ?Sized>(
    doc: &mut D,
    hero: NodeId,
    count: usize,
    seed: u64,
) -> Option<NodeId> {
    let container = doc.create_element("div", "particles-container")?;
    for (prop, value) in CONTAINER_STYLE {
        doc.set_style(container, prop, value);
    }
    for spec in particle_specs(count, seed) {
        let Some(particle) = doc.create_element("div", "particle") else {
            continue;
        };
        for (prop, value) in spec.styles() {
            doc.set_style(particle, prop, &value);
        }
        doc.append_child(container, particle);
    }
    doc.append_child(hero, container);
    tracing::debug!(count, "particles injected");
    Some(container)
}
