// src/messages.rs

use rand::Rng;
use rand::seq::IndexedRandom;

const WORK_MESSAGES: &[&str] = &[
    "Hey! You've been working hard for a while.",
    "Nice focus! Might be time for a break.",
    "You've earned a short break!",
    "Time check, consider resting your brain.",
];

const BREAK_MESSAGES: &[&str] = &[
    "Break time! Step away from the keyboard.",
    "Go stretch, hydrate, or relax for a bit.",
    "Enjoy your break, you've earned it.",
];

const RETURN_MESSAGES: &[&str] = &[
    "Welcome back! Ready to continue?",
    "Hope you're feeling refreshed!",
    "Let's get back to coding!",
];

/// Which pool a message is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// The work interval just elapsed.
    Work,
    /// The user is going on a break.
    Break,
    /// The break is over.
    Return,
}

impl Category {
    pub fn title(&self) -> &'static str {
        match self {
            Category::Work => "Break Reminder",
            Category::Break => "Break Time",
            Category::Return => "Break Complete",
        }
    }
}

/**
 * Static pools of reminder texts, one per category.
 */
#[derive(Debug, Clone)]
pub struct MessageBank {
    work: &'static [&'static str],
    brk: &'static [&'static str],
    ret: &'static [&'static str],
}

impl Default for MessageBank {
    fn default() -> Self {
        Self {
            work: WORK_MESSAGES,
            brk: BREAK_MESSAGES,
            ret: RETURN_MESSAGES,
        }
    }
}

impl MessageBank {
    pub fn pool(&self, category: Category) -> &'static [&'static str] {
        match category {
            Category::Work => self.work,
            Category::Break => self.brk,
            Category::Return => self.ret,
        }
    }

    /// Picks one message uniformly at random from the category's pool.
    pub fn pick<R: Rng + ?Sized>(&self, category: Category, rng: &mut R) -> &'static str {
        self.pool(category).choose(rng).copied().unwrap_or_default()
    }
}

/// The kinds of break the monitor can suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakType {
    EyeStrain,
    Water,
    Stretch,
    Walk,
}

impl BreakType {
    pub const ALL: [BreakType; 4] = [
        BreakType::EyeStrain,
        BreakType::Water,
        BreakType::Stretch,
        BreakType::Walk,
    ];

    /// Key used in the JSON configuration.
    pub fn key(&self) -> &'static str {
        match self {
            BreakType::EyeStrain => "eye_strain",
            BreakType::Water => "water",
            BreakType::Stretch => "stretch",
            BreakType::Walk => "walk",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BreakType::EyeStrain => "Eye Strain Relief",
            BreakType::Water => "Hydration Break",
            BreakType::Stretch => "Stretching Break",
            BreakType::Walk => "Walking Break",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BreakType::EyeStrain => {
                "Look away from your screen and focus on something 20 feet away for 20 seconds."
            }
            BreakType::Water => "Time to drink some water. Staying hydrated improves concentration.",
            BreakType::Stretch => "Stand up and stretch your arms and shoulders to prevent stiffness.",
            BreakType::Walk => "Take a short walk to refresh your mind and improve circulation.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_default_pools_are_not_empty() {
        let bank: MessageBank = MessageBank::default();
        for category in [Category::Work, Category::Break, Category::Return] {
            assert!(!bank.pool(category).is_empty());
        }
    }

    #[test]
    fn test_pick_reaches_every_member() {
        let bank: MessageBank = MessageBank::default();
        let mut rng: StdRng = StdRng::seed_from_u64(7);
        for category in [Category::Work, Category::Break, Category::Return] {
            let pool = bank.pool(category);
            let seen: HashSet<&str> = (0..500).map(|_| bank.pick(category, &mut rng)).collect();
            assert_eq!(seen.len(), pool.len(), "{:?} pool not fully covered", category);
        }
    }

    #[test]
    fn test_pick_single_member_pool() {
        let bank: MessageBank = MessageBank {
            work: &["only"],
            brk: &["b"],
            ret: &["c"],
        };
        let mut rng: StdRng = StdRng::seed_from_u64(1);
        assert_eq!(bank.pick(Category::Work, &mut rng), "only");
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let bank: MessageBank = MessageBank::default();
        let mut a: StdRng = StdRng::seed_from_u64(42);
        let mut b: StdRng = StdRng::seed_from_u64(42);
        let first: Vec<&str> = (0..20).map(|_| bank.pick(Category::Work, &mut a)).collect();
        let second: Vec<&str> = (0..20).map(|_| bank.pick(Category::Work, &mut b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_break_type_keys() {
        let keys: Vec<&str> = BreakType::ALL.iter().map(BreakType::key).collect();
        assert_eq!(keys, vec!["eye_strain", "water", "stretch", "walk"]);
    }
}
