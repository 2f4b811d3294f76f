use log::debug;

use super::{Categorization, Categorizer, CategoryError};
use crate::core::{Category, StructuredRecord};
use crate::extract::tokens;

/// Keyword hits in the vendor name weigh more than hits in item lines.
const VENDOR_WEIGHT: u32 = 2;
const ITEM_WEIGHT: u32 = 1;

/// Built-in keyword table. Keywords of four characters or less must match
/// a whole word (`bp`, `ns`, `plus`); longer ones match anywhere.
static RULES: &[(Category, &[&str])] = &[
    (
        Category::RepresentationRetail,
        &[
            "albert heijn", "jumbo", "lidl", "aldi", "plus", "dirk", "coop", "spar", "ekoplaza",
            "vomar", "hoogvliet", "supermarkt", "supermarket", "migros", "carrefour", "rewe",
            "edeka", "tesco",
        ],
    ),
    (
        Category::RepresentationHospitality,
        &[
            "restaurant", "cafe", "café", "coffee", "koffie", "espresso", "cappuccino", "bistro",
            "brasserie", "eetcafe", "lunchroom", "bar", "pizzeria", "lokanta", "kahve",
        ],
    ),
    (
        Category::TravelAndAccommodation,
        &[
            "hotel", "hostel", "airbnb", "booking.com", "klm", "transavia", "ryanair", "easyjet",
            "airline", "vlucht", "flight", "overnachting",
        ],
    ),
    (
        Category::Transportation,
        &[
            "shell", "esso", "bp", "tinq", "tango", "tankstation", "benzine", "diesel", "euro 95",
            "parkeren", "parking", "ns", "gvb", "ret", "htm", "ov-chipkaart", "uber", "taxi",
        ],
    ),
    (
        Category::ProfessionalExpenses,
        &[
            "mediamarkt", "coolblue", "bol.com", "amazon", "apple", "laptop", "monitor",
            "software", "licentie", "license", "subscription", "abonnement", "hosting",
        ],
    ),
    (
        Category::OfficeExpenses,
        &[
            "office", "kantoor", "staples", "makro", "viking", "papier", "paper", "printer",
            "inkt", "toner", "pennen", "bureau",
        ],
    ),
    (
        Category::BusinessTraining,
        &[
            "training", "course", "cursus", "opleiding", "udemy", "coursera", "workshop",
            "seminar", "congres", "boek", "studie",
        ],
    ),
];

/// Rule-based categorizer over vendor name and item descriptions.
///
/// A unique top score assigns the category. A tie, or no hit at all,
/// yields [`Categorization::Ambiguous`]; with no hits the best guess is
/// [`Category::OfficeExpenses`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordCategorizer;

impl KeywordCategorizer {
    pub fn new() -> Self {
        Self
    }

    /// Score of every category, in allow-list order.
    pub fn scores(&self, record: &StructuredRecord) -> Vec<(Category, u32)> {
        let vendor = record.vendor_name.as_deref().unwrap_or_default();
        let items: Vec<&str> = record
            .line_items
            .iter()
            .map(|item| item.description.as_str())
            .collect();

        Category::ALL
            .into_iter()
            .map(|category| {
                let keywords = RULES
                    .iter()
                    .find(|(c, _)| *c == category)
                    .map(|(_, k)| *k)
                    .unwrap_or_default();
                let score = hits(vendor, keywords) * VENDOR_WEIGHT
                    + items.iter().map(|d| hits(d, keywords)).sum::<u32>() * ITEM_WEIGHT;
                (category, score)
            })
            .collect()
    }
}

impl Categorizer for KeywordCategorizer {
    fn categorize(&self, record: &StructuredRecord) -> Result<Categorization, CategoryError> {
        let scores = self.scores(record);
        let top = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
        if top == 0 {
            debug!("no category keywords matched");
            return Ok(Categorization::Ambiguous {
                best: Category::OfficeExpenses,
                candidates: Vec::new(),
            });
        }

        let candidates: Vec<Category> = scores
            .iter()
            .filter(|(_, s)| *s == top)
            .map(|(c, _)| *c)
            .collect();
        match candidates.as_slice() {
            [single] => Ok(Categorization::Assigned(*single)),
            _ => {
                debug!("category tie at score {top}: {candidates:?}");
                Ok(Categorization::Ambiguous {
                    best: candidates[0],
                    candidates,
                })
            }
        }
    }
}

fn hits(text: &str, keywords: &[&str]) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let lower = text.to_lowercase();
    let words = tokens(text);
    let count = keywords
        .iter()
        .filter(|k| {
            if k.chars().count() <= 4 {
                words.contains(**k)
            } else {
                lower.contains(**k)
            }
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
