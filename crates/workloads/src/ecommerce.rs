//! Online store: catalogue browsing, vector product search, carts and orders.
//!
//! Tables, in foreign-key order:
//!
//! ```text
//! categories ─┐
//! brands ─────┼─► products (embedding) ─┬─► order_items ◄── orders ◄── customers
//!             │                         └─► cart_items ◄─────────────── customers
//! ```

use crate::support;
use crate::text;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use workload_core::{
    count_rows, BatchInserter, BatchOptions, Database, GenerationError, GeneratorConfig,
    LazyDispatcher, QueryDefinition, QueryDispatcher, QueryError, QueryHandlers, QueryResult,
    RowCountPlan, SchemaError, SqlValue, TableSizeInfo, Workload,
};
use workload_embed::{Embedder, EmbeddingProvider, RandomEmbedder};

pub const NAME: &str = "ecommerce";

/// Tables in creation order.
pub const TABLES: &[&str] = &[
    "categories",
    "brands",
    "products",
    "customers",
    "orders",
    "order_items",
    "cart_items",
];

pub const QUERIES: &[QueryDefinition] = &[
    QueryDefinition::read(
        "similar_products",
        "Nearest neighbours of a product's embedding",
        40,
    ),
    QueryDefinition::read(
        "semantic_search",
        "Vector search for a free-text phrase",
        20,
    ),
    QueryDefinition::read(
        "product_detail",
        "Product page with category and brand",
        15,
    ),
    QueryDefinition::write("add_to_cart", "Insert a cart item", 10),
    QueryDefinition::read(
        "browse_category",
        "Top-rated products of a category",
        10,
    ),
    QueryDefinition::write(
        "checkout",
        "Turn a customer's cart into an order",
        5,
    ),
];

const SCHEMA: &[&str] = &[
    support::CREATE_VECTOR_EXTENSION,
    "CREATE TABLE IF NOT EXISTS categories (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT
    )",
    "CREATE TABLE IF NOT EXISTS brands (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        name TEXT NOT NULL,
        country TEXT
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        category_id BIGINT NOT NULL REFERENCES categories(id),
        brand_id BIGINT NOT NULL REFERENCES brands(id),
        name TEXT NOT NULL,
        description TEXT,
        price DOUBLE PRECISION NOT NULL,
        stock BIGINT NOT NULL,
        rating DOUBLE PRECISION,
        embedding vector,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS customers (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        city TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        customer_id BIGINT NOT NULL REFERENCES customers(id),
        status TEXT NOT NULL,
        total DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS order_items (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders(id),
        product_id BIGINT NOT NULL REFERENCES products(id),
        quantity BIGINT NOT NULL,
        unit_price DOUBLE PRECISION NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS cart_items (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        customer_id BIGINT NOT NULL REFERENCES customers(id),
        product_id BIGINT NOT NULL REFERENCES products(id),
        quantity BIGINT NOT NULL,
        added_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)",
    "CREATE INDEX IF NOT EXISTS idx_cart_items_customer ON cart_items(customer_id)",
];

const ORDER_STATUSES: &[&str] = &["pending", "paid", "shipped", "delivered", "cancelled"];

/// E-commerce workload plugin.
#[derive(Default)]
pub struct Ecommerce {
    dispatcher: LazyDispatcher<EcommerceQueries>,
}

impl Ecommerce {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Workload for Ecommerce {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Online store with product similarity search, carts and checkout"
    }

    fn workload_type(&self) -> &'static str {
        "oltp+vector"
    }

    fn requires_vector_extension(&self) -> bool {
        true
    }

    fn table_sizes(&self) -> Vec<TableSizeInfo> {
        vec![
            TableSizeInfo::new("categories", 200, 20.0, 1.2),
            TableSizeInfo::new("brands", 150, 50.0, 1.2),
            TableSizeInfo::new("products", 2200, 500.0, 1.5).with_vector_columns(1),
            TableSizeInfo::new("customers", 300, 1000.0, 1.3),
            TableSizeInfo::new("orders", 150, 2000.0, 1.4),
            TableSizeInfo::new("order_items", 80, 5000.0, 1.3),
            TableSizeInfo::new("cart_items", 60, 800.0, 1.3),
        ]
    }

    fn queries(&self) -> &'static [QueryDefinition] {
        QUERIES
    }

    async fn create_schema(&self, db: &dyn Database) -> Result<(), SchemaError> {
        support::execute_ddl(db, SCHEMA).await?;
        info!("Created {} schema ({} tables)", NAME, TABLES.len());
        Ok(())
    }

    async fn drop_schema(&self, db: &dyn Database) -> Result<(), SchemaError> {
        support::drop_tables(db, TABLES).await?;
        info!("Dropped {} schema", NAME);
        Ok(())
    }

    async fn generate_data(
        &self,
        db: &dyn Database,
        config: &GeneratorConfig,
    ) -> Result<(), GenerationError> {
        config.validate()?;
        let embedder = Embedder::from_config(&config.embedding)?;
        let calculator = self.size_calculator(config.embedding.dimensions);
        let plan = calculator.calculate_row_counts(config.target_size);
        support::log_plan(NAME, &calculator, &plan, config.target_size);

        support::set_vector_dimensions(db, "products", "embedding", embedder.dimensions())
            .await?;

        let mut loader = Loader {
            db,
            options: BatchOptions::from(config),
            rng: StdRng::seed_from_u64(config.seed),
            plan: &plan,
        };
        loader.categories().await?;
        loader.brands().await?;
        loader.products(&embedder).await?;
        loader.customers().await?;
        loader.orders().await?;
        loader.order_items().await?;
        loader.cart_items().await?;

        for table in TABLES {
            support::resync_sequence(db, table).await?;
        }
        support::create_vector_index(db, "products", "embedding").await?;
        Ok(())
    }

    async fn execute_query(&self, db: &dyn Database) -> QueryResult {
        self.dispatcher
            .execute_random_query(db, || load_bounds(db))
            .await
    }
}

/// Sequential table loader sharing one seeded RNG.
struct Loader<'a> {
    db: &'a dyn Database,
    options: BatchOptions,
    rng: StdRng,
    plan: &'a RowCountPlan,
}

impl<'a> Loader<'a> {
    fn inserter(&self, table: &str, columns: &[&str]) -> (BatchInserter<'a>, u64) {
        (
            BatchInserter::new(self.db, table, columns, self.options),
            self.plan.rows(table),
        )
    }

    async fn categories(&mut self) -> Result<(), GenerationError> {
        let (mut inserter, rows) = self.inserter("categories", &["id", "name", "description"]);
        for id in 1..=rows as i64 {
            let words = self.rng.gen_range(8..16);
            inserter
                .push(vec![
                    id.into(),
                    text::category_name(id).into(),
                    text::sentence(&mut self.rng, words).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }

    async fn brands(&mut self) -> Result<(), GenerationError> {
        let (mut inserter, rows) = self.inserter("brands", &["id", "name", "country"]);
        for id in 1..=rows as i64 {
            inserter
                .push(vec![
                    id.into(),
                    text::brand_name(&mut self.rng, id).into(),
                    text::country(&mut self.rng).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }

    async fn products(&mut self, embedder: &Embedder) -> Result<(), GenerationError> {
        let (mut inserter, rows) = self.inserter(
            "products",
            &[
                "id",
                "category_id",
                "brand_id",
                "name",
                "description",
                "price",
                "stock",
                "rating",
                "embedding",
                "created_at",
            ],
        );
        let categories = self.plan.rows("categories");
        let brands = self.plan.rows("brands");

        for id in 1..=rows as i64 {
            let name = text::product_name(&mut self.rng);
            let description = text::paragraph(&mut self.rng, 2);
            let embedding =
                support::embed(embedder, "products", &format!("{name}. {description}")).await?;
            let rating: Option<f64> = if self.rng.gen_bool(0.9) {
                Some((self.rng.gen_range(10..=50) as f64) / 10.0)
            } else {
                None
            };
            inserter
                .push(vec![
                    id.into(),
                    support::seeded_id(&mut self.rng, categories).into(),
                    support::seeded_id(&mut self.rng, brands).into(),
                    name.into(),
                    description.into(),
                    text::price(&mut self.rng).into(),
                    self.rng.gen_range(0i64..500).into(),
                    rating.into(),
                    embedding.into(),
                    text::timestamp_within(&mut self.rng, 730).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }

    async fn customers(&mut self) -> Result<(), GenerationError> {
        let (mut inserter, rows) =
            self.inserter("customers", &["id", "name", "email", "city", "created_at"]);
        for id in 1..=rows as i64 {
            let name = text::person_name(&mut self.rng);
            let email = text::email(&name, id);
            inserter
                .push(vec![
                    id.into(),
                    name.into(),
                    email.into(),
                    text::city(&mut self.rng).into(),
                    text::timestamp_within(&mut self.rng, 1095).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }

    async fn orders(&mut self) -> Result<(), GenerationError> {
        let (mut inserter, rows) = self.inserter(
            "orders",
            &["id", "customer_id", "status", "total", "created_at"],
        );
        let customers = self.plan.rows("customers");
        for id in 1..=rows as i64 {
            let total = (1..=self.rng.gen_range(1..=4))
                .map(|_| text::price(&mut self.rng))
                .sum::<f64>();
            inserter
                .push(vec![
                    id.into(),
                    support::seeded_id(&mut self.rng, customers).into(),
                    text::pick(&mut self.rng, ORDER_STATUSES).into(),
                    ((total * 100.0).round() / 100.0).into(),
                    text::timestamp_within(&mut self.rng, 365).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }

    async fn order_items(&mut self) -> Result<(), GenerationError> {
        let (mut inserter, rows) = self.inserter(
            "order_items",
            &["id", "order_id", "product_id", "quantity", "unit_price"],
        );
        let orders = self.plan.rows("orders");
        let products = self.plan.rows("products");
        for id in 1..=rows as i64 {
            inserter
                .push(vec![
                    id.into(),
                    support::seeded_id(&mut self.rng, orders).into(),
                    support::seeded_id(&mut self.rng, products).into(),
                    self.rng.gen_range(1i64..=5).into(),
                    text::price(&mut self.rng).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }

    async fn cart_items(&mut self) -> Result<(), GenerationError> {
        let (mut inserter, rows) = self.inserter(
            "cart_items",
            &["id", "customer_id", "product_id", "quantity", "added_at"],
        );
        let customers = self.plan.rows("customers");
        let products = self.plan.rows("products");
        for id in 1..=rows as i64 {
            inserter
                .push(vec![
                    id.into(),
                    support::seeded_id(&mut self.rng, customers).into(),
                    support::seeded_id(&mut self.rng, products).into(),
                    self.rng.gen_range(1i64..=3).into(),
                    text::timestamp_within(&mut self.rng, 14).into(),
                ])
                .await?;
        }
        inserter.finish().await?;
        Ok(())
    }
}

/// Count the loaded rows and build the dispatcher over them.
async fn load_bounds(db: &dyn Database) -> Result<QueryDispatcher<EcommerceQueries>, QueryError> {
    let handlers = EcommerceQueries {
        categories: count_rows(db, "categories").await?,
        products: count_rows(db, "products").await?,
        customers: count_rows(db, "customers").await?,
        embedder: RandomEmbedder::new(
            support::stored_dimensions(db, "products", "embedding").await?,
        ),
    };
    info!(
        "{} bounds: {} categories, {} products, {} customers, {}-dimensional embeddings",
        NAME,
        handlers.categories,
        handlers.products,
        handlers.customers,
        handlers.embedder.dimensions()
    );
    Ok(QueryDispatcher::new(QUERIES, handlers)?)
}

/// Query handlers over row-count bounds captured at first use.
pub struct EcommerceQueries {
    categories: u64,
    products: u64,
    customers: u64,
    embedder: RandomEmbedder,
}

#[async_trait]
impl QueryHandlers for EcommerceQueries {
    async fn run(&self, name: &str, db: &dyn Database) -> Result<u64, QueryError> {
        match name {
            "similar_products" => self.similar_products(db).await,
            "semantic_search" => self.semantic_search(db).await,
            "product_detail" => self.product_detail(db).await,
            "add_to_cart" => self.add_to_cart(db).await,
            "browse_category" => self.browse_category(db).await,
            "checkout" => self.checkout(db).await,
            other => Err(QueryError::UnknownQuery(other.to_string())),
        }
    }
}

impl EcommerceQueries {
    async fn similar_products(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let rows = db
            .query(
                "SELECT p.id, p.name, p.price FROM products p \
                 WHERE p.id <> $1 \
                 ORDER BY p.embedding <=> (SELECT embedding FROM products WHERE id = $1) \
                 LIMIT 10",
                &[support::random_id(self.products).into()],
            )
            .await?;
        Ok(rows.len() as u64)
    }

    async fn semantic_search(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let phrase = text::search_phrase(&mut rand::thread_rng());
        let vector = SqlValue::Vector(self.embedder.embed_text(&phrase));
        let sql = format!(
            "SELECT id, name, price FROM products ORDER BY embedding <=> {} LIMIT 10",
            db.placeholder(1, &vector)
        );
        let rows = db.query(&sql, &[vector]).await?;
        Ok(rows.len() as u64)
    }

    async fn product_detail(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let rows = db
            .query(
                "SELECT p.id, p.name, p.description, p.price, p.stock, p.rating, \
                        c.name, b.name \
                 FROM products p \
                 JOIN categories c ON c.id = p.category_id \
                 JOIN brands b ON b.id = p.brand_id \
                 WHERE p.id = $1",
                &[support::random_id(self.products).into()],
            )
            .await?;
        Ok(rows.len() as u64)
    }

    async fn add_to_cart(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let quantity: i64 = rand::thread_rng().gen_range(1..=3);
        let affected = db
            .exec(
                "INSERT INTO cart_items (customer_id, product_id, quantity, added_at) \
                 VALUES ($1, $2, $3, $4)",
                &[
                    support::random_id(self.customers).into(),
                    support::random_id(self.products).into(),
                    quantity.into(),
                    Utc::now().into(),
                ],
            )
            .await?;
        Ok(affected)
    }

    async fn browse_category(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let rows = db
            .query(
                "SELECT id, name, price, rating FROM products \
                 WHERE category_id = $1 \
                 ORDER BY rating DESC NULLS LAST \
                 LIMIT 20",
                &[support::random_id(self.categories).into()],
            )
            .await?;
        Ok(rows.len() as u64)
    }

    /// Move one customer's cart into a new order. An empty cart still
    /// produces an order with a zero total.
    async fn checkout(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let row = db
            .query_row(
                CHECKOUT_SQL,
                &[
                    support::random_id(self.customers).into(),
                    Utc::now().into(),
                ],
            )
            .await?;
        Ok(row.get_i64(0)?.max(0) as u64)
    }
}

/// Checkout as one statement: the cart rows are deleted and their
/// `RETURNING` output feeds the order, so an item added concurrently is
/// either ordered and cleared or left in the cart. Returns the order row
/// plus items written plus cart rows cleared.
const CHECKOUT_SQL: &str = "\
WITH cart AS ( \
    DELETE FROM cart_items WHERE customer_id = $1::bigint \
    RETURNING product_id, quantity \
), priced AS ( \
    SELECT cart.product_id, cart.quantity, p.price \
    FROM cart JOIN products p ON p.id = cart.product_id \
), new_order AS ( \
    INSERT INTO orders (customer_id, status, total, created_at) \
    SELECT $1::bigint, 'pending', COALESCE(SUM(quantity * price), 0), $2::timestamptz FROM priced \
    RETURNING id \
), items AS ( \
    INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
    SELECT new_order.id, priced.product_id, priced.quantity, priced.price \
    FROM new_order CROSS JOIN priced \
    RETURNING 1 \
) \
SELECT 1 + (SELECT COUNT(*) FROM items) + (SELECT COUNT(*) FROM cart)";
