//! Persona-indexed phrase tables used for fallback authoring and
//! replenishment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use menuprobe_core_types::Persona;
use phrase_store::Section;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use session_judge::SignalVector;
use thiserror::Error;

use crate::category::GENERIC;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to read phrase pools {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid phrase pools: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type PhraseTable = BTreeMap<String, Vec<String>>;

/// Slot lists combined into one sentence per serial number.
///
/// Every slot holds the same prime number `q` of phrases. Serial `m` is read
/// as base-`q` digits `(a, b, c)` and slot `x` takes phrase
/// `(a + b*x + c*x*x) mod q`. Two distinct quadratics agree on at most two
/// points, so any two serials below `q^3` share at most two slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateGrid {
    pub slots: Vec<Vec<String>>,
}

impl TemplateGrid {
    /// Phrases per slot, when the grid is well formed.
    pub fn radix(&self) -> Option<usize> {
        let q = self.slots.first()?.len();
        let uniform = self.slots.iter().all(|slot| slot.len() == q);
        (uniform && is_prime(q) && (3..=q).contains(&self.slots.len())).then_some(q)
    }

    pub fn capacity(&self) -> usize {
        self.radix().map_or(0, |q| q.pow(3))
    }

    pub fn render(&self, serial: usize) -> Option<String> {
        let q = self.radix()?;
        if serial >= q.pow(3) {
            return None;
        }
        let (a, b, c) = (serial % q, serial / q % q, serial / (q * q));
        let parts: Vec<&str> = self
            .slots
            .iter()
            .enumerate()
            .map(|(x, slot)| slot[(a + b * x + c * x * x) % q].as_str())
            .collect();
        Some(parts.join(" "))
    }
}

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhrasePools {
    pub worked_well: PhraseTable,
    pub minor_friction: PhraseTable,
    pub improvements: PhraseTable,
    /// Improvement category suggested by each friction category.
    pub friction_to_improvement: BTreeMap<String, String>,
    pub templates: BTreeMap<Section, TemplateGrid>,
}

impl Default for PhrasePools {
    fn default() -> Self {
        Self::builtin()
    }
}

fn table(rows: &[(&str, &[&str])]) -> PhraseTable {
    rows.iter()
        .map(|(category, phrases)| (category.to_string(), owned(phrases)))
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn grid(slots: &[&[&str]]) -> TemplateGrid {
    TemplateGrid {
        slots: slots.iter().map(|slot| owned(slot)).collect(),
    }
}

const PLACES: &[&str] = &[
    "beside each price", "inside the cart drawer", "within search results",
    "atop every category", "under dish photos", "on the item sheet",
    "near the order summary", "along the menu sidebar", "in the restaurant header",
    "next to quantity controls", "below the store hours",
];

const AUDIENCES: &[&str] = &[
    "for first-time visitors", "for shoppers on a budget", "for diners with allergies",
    "for screen reader users", "for late-night orderers", "for families ordering together",
    "for people with low vision", "for commuters grabbing pickup", "for students near campus",
    "for returning customers", "for plant-based eaters",
];

const MOMENTS: &[&str] = &[
    "while browsing", "before adding items", "during customisation",
    "when comparing dishes", "right after search", "as the cart updates",
    "on slow connections", "at the first visit", "whenever prices change",
    "during peak hours", "ahead of the review step",
];

const FEATURES: &[&str] = &[
    "dish photos", "price labels", "section headers", "item sheets", "cart badges",
    "ingredient notes", "quantity steppers", "store hour banners", "rating summaries",
    "modifier lists", "search suggestions",
];

impl PhrasePools {
    pub fn builtin() -> Self {
        let worked_well = table(&[
            ("diet", &[
                "Dietary icons sat right next to dish names",
                "Plant-based dishes were grouped in their own menu block",
                "Ingredient lists spelled out dairy and egg content",
                "The vegetarian toggle stayed applied while browsing categories",
                "Swapping a protein for tofu took a single tap",
            ]),
            ("accessibility", &[
                "Primary buttons had generous touch areas",
                "Text stayed legible at the larger system font size",
                "Item photos carried meaningful alt descriptions",
                "Focus moved predictably from the menu to the cart sheet",
                "Price labels kept strong contrast against the background",
            ]),
            ("budget", &[
                "Prices were visible on every menu card before opening it",
                "The running subtotal updated as soon as an item was added",
                "Sorting by price surfaced affordable bowls quickly",
                "Combo savings were stated as a plain dollar amount",
                "Half portions offered a cheaper way to stay on target",
            ]),
            ("navigation", &[
                "Search returned relevant dishes after a few letters",
                "Menu categories were short and clearly named",
                "The sticky category bar made jumping between sections easy",
                "Back navigation kept the scroll position on the menu",
                "Item detail sheets opened without leaving the page",
            ]),
            ("checkout", &[
                "The cart button showed an item count at all times",
                "Pickup and delivery choices were offered up front",
                "Editing quantities in the cart needed no extra confirmation",
                "The order review listed every modifier that was chosen",
            ]),
            (GENERIC, &[
                "Pages loaded quickly on a mobile connection",
                "Friendly microcopy explained each step of ordering",
                "Photos matched what the dish descriptions promised",
                "The layout avoided clutter on a small screen",
                "No account was required to start building an order",
                "Store hours and prep times were easy to spot",
            ]),
        ]);

        let minor_friction = table(&[
            ("diet", &[
                "The vegan filter reset after opening an item",
                "Some sauces did not say whether they contained dairy",
                "Gluten-free options were only mentioned in fine print",
                "Dietary tags were missing from the daily specials",
                "Substitution notes used inconsistent wording across dishes",
            ]),
            ("accessibility", &[
                "Quantity steppers were small and close together",
                "Light grey captions were hard to read outdoors",
                "Icon-only buttons had no visible text label",
                "Modal dialogs trapped focus behind the page header",
                "Tiny close controls made dismissing sheets fiddly",
            ]),
            ("budget", &[
                "Prices for add-ons only appeared after selecting them",
                "Size options did not show their price difference",
                "No quick way existed to sort dishes by cost",
                "The cheapest combo was buried at the bottom of the list",
            ]),
            ("fees", &[
                "A service fee showed up only at the final step",
                "Delivery charges varied without any explanation",
                "The tip prompt defaulted to a high percentage",
                "Tax was left out of the cart subtotal",
            ]),
            ("navigation", &[
                "Category names overlapped and felt redundant",
                "Search ignored common misspellings of dish names",
                "The menu required long scrolling to reach sides",
                "Returning from an item jumped back to the top of the menu",
                "Filter chips scrolled off screen horizontally",
            ]),
            ("checkout", &[
                "The cart drawer covered the add-to-order confirmation",
                "Changing pickup time meant reopening the cart",
                "Promo code entry was hidden behind a small link",
                "Modifier choices were collapsed in the cart summary",
            ]),
            ("performance", &[
                "Item images popped in late and shifted the layout",
                "The cart took a moment to reflect new items",
                "A spinner lingered after choosing a location",
            ]),
            ("upsell", &[
                "Drink suggestions interrupted every add to cart",
                "A combo upgrade prompt appeared before the base item was added",
                "Dessert recommendations pushed the total past the goal",
            ]),
            (GENERIC, &[
                "Some buttons used vague labels like Continue",
                "Item descriptions varied a lot in length and detail",
                "The store banner took up much of the first screen",
                "Wording on portion sizes was inconsistent",
                "A promotional carousel auto-advanced too fast",
            ]),
        ]);

        let improvements = table(&[
            ("diet", &[
                "Keep dietary filters applied across item detail views",
                "Add dietary badges to daily specials and seasonal items",
                "Let diners save a dietary profile that pre-filters the menu",
                "Show a plant-based swap suggestion on dishes with meat",
            ]),
            ("allergen", &[
                "Provide an allergen matrix linked from every dish",
                "Flag common allergens with icons beside ingredient lists",
                "Let shoppers exclude specific allergens before browsing",
            ]),
            ("accessibility", &[
                "Enlarge quantity steppers to at least 44 point targets",
                "Raise caption contrast to meet WCAG AA",
                "Give icon-only controls descriptive accessible names",
                "Return focus to the triggering control when sheets close",
            ]),
            ("budget", &[
                "Offer a sort option from lowest to highest price",
                "Show price deltas directly on size and add-on choices",
                "Highlight dishes that fit a stated spending limit",
            ]),
            ("fees", &[
                "Disclose service and delivery fees on the menu page",
                "Include estimated tax in the cart subtotal",
                "Default the tip selector to a modest option or none",
                "Explain why a delivery charge changed in plain words",
            ]),
            ("navigation", &[
                "Merge overlapping categories into fewer clear groups",
                "Make search tolerant of typos and partial dish names",
                "Preserve scroll position when returning from an item",
                "Pin filter chips in a wrapping row instead of a carousel",
            ]),
            ("checkout", &[
                "Move the pickup time picker into the cart summary",
                "Expand chosen modifiers inline on the order review",
                "Keep the add confirmation visible above the cart drawer",
                "Place the promo code field beside the subtotal",
            ]),
            ("performance", &[
                "Reserve image space so cards do not jump while loading",
                "Update the cart badge optimistically after each add",
                "Cache the chosen location to skip the second spinner",
            ]),
            ("upsell", &[
                "Limit drink prompts to one per order",
                "Offer combo upgrades only after the base item is in the cart",
                "Let diners dismiss recommendations for the whole session",
            ]),
            (GENERIC, &[
                "Replace vague button labels with the action they perform",
                "Standardise portion wording across the menu",
                "Shrink the store banner so dishes appear above the fold",
                "Pause promotional carousels until the user interacts",
            ]),
        ]);

        let friction_to_improvement = [
            ("diet", "diet"),
            ("accessibility", "accessibility"),
            ("budget", "budget"),
            ("fees", "fees"),
            ("navigation", "navigation"),
            ("checkout", "checkout"),
            ("performance", "performance"),
            ("upsell", "upsell"),
            ("allergen", "allergen"),
            (GENERIC, GENERIC),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        let templates = [
            (
                Section::WorkedWell,
                grid(&[
                    &[
                        "Reliably clear", "Nicely compact", "Consistently visible", "Pleasantly quick",
                        "Well organised", "Easy to read", "Refreshingly simple", "Thoughtfully labelled",
                        "Surprisingly smooth", "Neatly aligned", "Genuinely helpful",
                    ],
                    FEATURES,
                    PLACES,
                    AUDIENCES,
                    MOMENTS,
                    &[
                        "which kept the flow moving", "which saved several taps", "which made comparison easy",
                        "which built early confidence", "which avoided any backtracking", "which matched the stated budget",
                        "which suited one-handed use", "which reduced scrolling", "which clarified the options",
                        "which felt trustworthy", "which sped up the choice",
                    ],
                ]),
            ),
            (
                Section::MinorFriction,
                grid(&[
                    &[
                        "Slightly confusing", "Easy to overlook", "Inconsistently placed", "Rather crowded",
                        "Slow to appear", "Oddly truncated", "Hard to tap", "Faintly rendered",
                        "Unexpectedly hidden", "Loosely worded", "Awkwardly ordered",
                    ],
                    FEATURES,
                    PLACES,
                    AUDIENCES,
                    MOMENTS,
                    &[
                        "which caused a brief pause", "which forced extra scrolling", "which needed a second look",
                        "which cost a few taps", "which blurred the total", "which slowed the comparison",
                        "which broke concentration", "which invited mis-taps", "which hid a useful detail",
                        "which prompted a backtrack", "which muddied the choice",
                    ],
                ]),
            ),
            (
                Section::Improvements,
                grid(&[
                    &[
                        "Add a clear", "Surface a compact", "Pin a persistent", "Offer an optional",
                        "Show a short", "Introduce a simple", "Provide a visible", "Expose a tappable",
                        "Display a concise", "Bring in a labelled", "Include a small",
                    ],
                    &[
                        "spice level marker", "portion size hint", "reorder shortcut", "prep time estimate",
                        "ingredient summary", "pickup window picker", "calorie range note", "substitution menu",
                        "delivery fee breakdown", "allergen legend", "dish rating badge",
                    ],
                    PLACES,
                    AUDIENCES,
                    MOMENTS,
                    &[
                        "to cut down guesswork", "so choices feel safer", "to speed up decisions",
                        "so totals hold no surprises", "to reduce backtracking", "so nothing gets missed",
                        "to build trust early", "so comparisons stay easy", "to ease one-handed use",
                        "so errors surface sooner", "to shorten the path",
                    ],
                ]),
            ),
        ]
        .into_iter()
        .collect();

        Self {
            worked_well,
            minor_friction,
            improvements,
            friction_to_improvement,
            templates,
        }
    }

    /// Parse a YAML document. Omitted tables fall back to the built-in ones.
    pub fn from_yaml_str(raw: &str) -> Result<Self, PoolError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, PoolError> {
        let raw = fs::read_to_string(path).map_err(|source| PoolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn table(&self, section: Section) -> &PhraseTable {
        match section {
            Section::WorkedWell => &self.worked_well,
            Section::MinorFriction => &self.minor_friction,
            Section::Improvements => &self.improvements,
        }
    }

    pub fn template(&self, section: Section) -> Option<&TemplateGrid> {
        self.templates.get(&section)
    }

    pub fn improvement_category_for<'a>(&'a self, friction_category: &'a str) -> &'a str {
        self.friction_to_improvement
            .get(friction_category)
            .map(String::as_str)
            .unwrap_or(friction_category)
    }

    /// Candidates for `section` ordered for this persona: persona axes in a
    /// seeded order, each axis shuffled, then the generic table.
    pub fn candidates<R: Rng>(
        &self,
        section: Section,
        persona: &Persona,
        signals: &SignalVector,
        rng: &mut R,
    ) -> Vec<(String, String)> {
        let table = self.table(section);
        let mut axes = persona_axes(section, persona, signals);
        axes.shuffle(rng);
        axes.push(GENERIC);

        let mut out = Vec::new();
        for axis in axes {
            let Some(phrases) = table.get(axis) else {
                continue;
            };
            let mut phrases: Vec<&String> = phrases.iter().collect();
            phrases.shuffle(rng);
            out.extend(
                phrases
                    .into_iter()
                    .map(|phrase| (axis.to_string(), phrase.clone())),
            );
        }
        out
    }
}

/// Pool categories relevant to a persona, before ordering.
pub fn persona_axes(section: Section, persona: &Persona, signals: &SignalVector) -> Vec<&'static str> {
    let mut axes = Vec::new();
    if persona.has_diet() {
        axes.push("diet");
        if section == Section::Improvements {
            axes.push("allergen");
        }
    }
    if persona.has_accessibility_need() {
        axes.push("accessibility");
    }
    if persona.target_budget().is_some() || signals.budget_met {
        axes.push("budget");
    }
    if section != Section::WorkedWell {
        if signals.budget_exceeded {
            axes.push("fees");
        }
        if signals.timeouts > 0 || signals.long_waits > 0 {
            axes.push("performance");
        }
    }
    axes.push("navigation");
    axes.push("checkout");
    axes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use text_similarity::{normalize_phrase, SimilarityThresholds};

    #[test]
    fn template_render_requires_prime_uniform_slots() {
        let small = grid(&[&["a", "b", "c"], &["d", "e", "f"], &["g", "h", "i"]]);
        assert_eq!(small.capacity(), 27);
        assert_eq!(small.render(0).as_deref(), Some("a d g"));
        assert_eq!(small.render(1).as_deref(), Some("b e h"));
        assert_eq!(small.render(27), None);

        let ragged = grid(&[&["a", "b", "c"], &["d", "e"], &["g", "h", "i"]]);
        assert_eq!(ragged.capacity(), 0);
        assert_eq!(ragged.render(0), None);
        let composite = grid(&[&["a", "b", "c", "d"], &["e", "f", "g", "h"], &["i", "j", "k", "l"]]);
        assert_eq!(composite.capacity(), 0);
    }

    #[test]
    fn builtin_serials_share_at_most_two_slots() {
        let thresholds = SimilarityThresholds::default();
        let pools = PhrasePools::builtin();
        for section in Section::ALL {
            let grid = pools.template(section).unwrap();
            assert_eq!(grid.capacity(), 1331);
            let rendered: Vec<String> = (0..120).map(|serial| grid.render(serial).unwrap()).collect();
            for (i, left) in rendered.iter().enumerate() {
                for right in &rendered[i + 1..] {
                    let (left, right) = (normalize_phrase(left), normalize_phrase(right));
                    assert!(
                        !thresholds.too_similar(&left, &right),
                        "{section:?}: {left} ~ {right}"
                    );
                }
            }
        }
    }

    #[test]
    fn persona_axes_lead_candidates() {
        let mut persona = Persona::new("D-01");
        persona.diet = "vegan".into();
        let pools = PhrasePools::builtin();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let candidates = pools.candidates(
            Section::MinorFriction,
            &persona,
            &SignalVector::default(),
            &mut rng,
        );
        assert!(candidates.iter().any(|(category, _)| category == "diet"));
        assert_eq!(candidates.last().map(|(c, _)| c.as_str()), Some(GENERIC));
    }

    #[test]
    fn yaml_overrides_one_table() {
        let pools = PhrasePools::from_yaml_str(
            "improvements:\n  generic:\n    - Offer a printable menu\n",
        )
        .unwrap();
        assert_eq!(pools.improvements.len(), 1);
        assert!(!pools.worked_well.is_empty());
        assert!(pools.template(Section::Improvements).is_some());
    }
}
