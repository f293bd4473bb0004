use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

// ─── Constants ───────────────────────────────────────────────────

pub const NUM_USERS: u32 = 1_000;
pub const NUM_PRODUCTS: u32 = 200;

// ─── Name pools ──────────────────────────────────────────────────

static FIRST: &[&str] = &[
    "Emma", "Liam", "Olivia", "Noah", "Ava", "Ethan", "Sophia", "Mason", "Isabella", "William",
    "Mia", "James", "Charlotte", "Benjamin", "Amelia", "Lucas", "Harper", "Henry",
];

static LAST: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Anderson", "Taylor", "Moore", "Jackson", "Lee", "White", "Clark",
];

static ROLES: &[&str] = &["admin", "editor", "viewer"];

static ADJ: &[&str] = &[
    "Premium", "Wireless", "Smart", "Compact", "Ergonomic", "Portable", "Classic", "Modern",
    "Turbo", "Mini", "Pro", "Max",
];

static NOUN: &[&str] = &[
    "Keyboard", "Mouse", "Monitor", "Headphones", "Speaker", "Camera", "Tablet", "Charger", "Hub",
    "Dock", "Webcam", "Router",
];

static CAT: &[&str] = &["electronics", "accessories", "audio", "computing", "gaming"];

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prefs {
    pub theme: String,
    pub lang: String,
    pub notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Absent for users created without preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefs: Option<Prefs>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    /// Price in cents (e.g. 12999 = $129.99)
    pub price: u64,
    pub stock: u32,
    pub category: String,
    pub tags: Vec<String>,
}

/// In-memory users and products the demo handlers serve.
pub struct Catalog {
    users: RwLock<HashMap<String, User>>,
    products: HashMap<String, Product>,
    next_user: AtomicU64,
}

pub fn user_id(n: u32) -> String {
    format!("usr_{n:08}")
}

pub fn product_id(n: u32) -> String {
    format!("prod_{n:04}")
}

impl Catalog {
    /// Deterministic seed so re-runs produce the same data.
    pub fn seeded() -> Self {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(42);

        let users = (1..=NUM_USERS)
            .map(|i| {
                let user = random_user(&mut rng, i);
                (user.id.clone(), user)
            })
            .collect();
        let products = (1..=NUM_PRODUCTS)
            .map(|i| {
                let product = random_product(&mut rng, i);
                (product.id.clone(), product)
            })
            .collect();

        info!(
            users = NUM_USERS,
            products = NUM_PRODUCTS,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "demo catalog seeded"
        );

        Self {
            users: RwLock::new(users),
            products,
            next_user: AtomicU64::new(u64::from(NUM_USERS) + 1),
        }
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.read().get(id).cloned()
    }

    pub fn product(&self, id: &str) -> Option<Product> {
        self.products.get(id).cloned()
    }

    pub fn insert_user(
        &self,
        name: String,
        email: String,
        role: String,
        prefs: Option<Prefs>,
    ) -> User {
        let n = self.next_user.fetch_add(1, Ordering::Relaxed);
        let user = User {
            id: format!("usr_{n:08}"),
            name,
            email,
            role,
            prefs,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.users.write().insert(user.id.clone(), user.clone());
        user
    }
}

fn random_user(rng: &mut StdRng, i: u32) -> User {
    let first = FIRST[rng.gen_range(0..FIRST.len())];
    let last = LAST[rng.gen_range(0..LAST.len())];
    let prefs = rng.gen_bool(0.8).then(|| Prefs {
        theme: (if rng.gen_bool(0.5) { "dark" } else { "light" }).into(),
        lang: "en".into(),
        notifications: rng.gen_bool(0.7),
    });
    User {
        id: user_id(i),
        name: format!("{first} {last}"),
        email: format!("{}.{}{i}@example.com", first.to_lowercase(), last.to_lowercase()),
        role: ROLES[rng.gen_range(0..ROLES.len())].into(),
        prefs,
        created_at: "2025-01-15T09:23:11Z".into(),
    }
}

fn random_product(rng: &mut StdRng, i: u32) -> Product {
    let adj = ADJ[rng.gen_range(0..ADJ.len())];
    let noun = NOUN[rng.gen_range(0..NOUN.len())];
    let category = CAT[rng.gen_range(0..CAT.len())];
    Product {
        id: product_id(i),
        title: format!("{adj} {noun}"),
        price: rng.gen_range(999..=99_999u64),
        stock: rng.gen_range(0..=1000u32),
        category: category.into(),
        tags: vec![category.into(), adj.to_lowercase()],
    }
}
