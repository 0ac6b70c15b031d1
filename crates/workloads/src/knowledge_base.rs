//! Documentation portal: retrieval-style semantic search over articles,
//! with comments and occasional edits that re-embed the article body.

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
    SchemaError, SqlValue, TableSizeInfo, Workload,
};
use workload_embed::{Embedder, EmbeddingProvider, RandomEmbedder};

pub const NAME: &str = "knowledge_base";

pub const TABLES: &[&str] = &["authors", "articles", "comments"];

pub const QUERIES: &[QueryDefinition] = &[
    QueryDefinition::read(
        "semantic_search",
        "Top articles for a free-text question",
        45,
    ),
    QueryDefinition::read(
        "related_articles",
        "Nearest neighbours of an article",
        25,
    ),
    QueryDefinition::read(
        "article_detail",
        "Article with author and comment count",
        15,
    ),
    QueryDefinition::write("add_comment", "Insert a comment", 10),
    QueryDefinition::write(
        "update_article",
        "Rewrite an article body and its embedding",
        5,
    ),
];

const SCHEMA: &[&str] = &[
    support::CREATE_VECTOR_EXTENSION,
    "CREATE TABLE IF NOT EXISTS authors (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        bio TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS articles (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        author_id BIGINT NOT NULL REFERENCES authors(id),
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        tags TEXT,
        view_count BIGINT NOT NULL DEFAULT 0,
        embedding vector,
        published_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        article_id BIGINT NOT NULL REFERENCES articles(id),
        author_name TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_articles_author ON articles(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_article ON comments(article_id)",
];

#[derive(Default)]
pub struct KnowledgeBase {
    dispatcher: LazyDispatcher<KnowledgeBaseQueries>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Workload for KnowledgeBase {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Article store with semantic search for retrieval-augmented generation"
    }

    fn workload_type(&self) -> &'static str {
        "rag"
    }

    fn requires_vector_extension(&self) -> bool {
        true
    }

    fn table_sizes(&self) -> Vec<TableSizeInfo> {
        vec![
            TableSizeInfo::new("authors", 250, 50.0, 1.2),
            TableSizeInfo::new("articles", 3000, 500.0, 1.5).with_vector_columns(1),
            TableSizeInfo::new("comments", 400, 2500.0, 1.3),
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

        support::set_vector_dimensions(db, "articles", "embedding", embedder.dimensions())
            .await?;

        let options = BatchOptions::from(config);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let authors = plan.rows("authors");
        let articles = plan.rows("articles");

        let mut inserter = BatchInserter::new(
            db,
            "authors",
            &["id", "name", "email", "bio", "created_at"],
            options,
        );
        for id in 1..=authors as i64 {
            let name = text::person_name(&mut rng);
            let email = text::email(&name, id);
            inserter
                .push(vec![
                    id.into(),
                    name.into(),
                    email.into(),
                    text::paragraph(&mut rng, 1).into(),
                    text::timestamp_within(&mut rng, 1095).into(),
                ])
                .await?;
        }
        inserter.finish().await?;

        let mut inserter = BatchInserter::new(
            db,
            "articles",
            &[
                "id",
                "author_id",
                "title",
                "body",
                "tags",
                "view_count",
                "embedding",
                "published_at",
                "updated_at",
            ],
            options,
        );
        for id in 1..=articles as i64 {
            let title = text::article_title(&mut rng);
            let paragraphs = rng.gen_range(3..=6);
            let body = text::paragraph(&mut rng, paragraphs);
            let embedding =
                support::embed(&embedder, "articles", &format!("{title}\n\n{body}")).await?;
            let published = text::timestamp_within(&mut rng, 730);
            let updated = if rng.gen_bool(0.3) {
                text::timestamp_after(&mut rng, published, 90)
            } else {
                published
            };
            inserter
                .push(vec![
                    id.into(),
                    support::seeded_id(&mut rng, authors).into(),
                    title.into(),
                    body.into(),
                    text::tags(&mut rng).into(),
                    rng.gen_range(0i64..10_000).into(),
                    embedding.into(),
                    published.into(),
                    updated.into(),
                ])
                .await?;
        }
        inserter.finish().await?;

        let mut inserter = BatchInserter::new(
            db,
            "comments",
            &["id", "article_id", "author_name", "body", "created_at"],
            options,
        );
        for id in 1..=plan.rows("comments") as i64 {
            let words = rng.gen_range(5..25);
            inserter
                .push(vec![
                    id.into(),
                    support::seeded_id(&mut rng, articles).into(),
                    text::person_name(&mut rng).into(),
                    text::sentence(&mut rng, words).into(),
                    text::timestamp_within(&mut rng, 365).into(),
                ])
                .await?;
        }
        inserter.finish().await?;

        for table in TABLES {
            support::resync_sequence(db, table).await?;
        }
        support::create_vector_index(db, "articles", "embedding").await?;
        Ok(())
    }

    async fn execute_query(&self, db: &dyn Database) -> QueryResult {
        self.dispatcher
            .execute_random_query(db, || load_bounds(db))
            .await
    }
}

async fn load_bounds(
    db: &dyn Database,
) -> Result<QueryDispatcher<KnowledgeBaseQueries>, QueryError> {
    let handlers = KnowledgeBaseQueries {
        articles: count_rows(db, "articles").await?,
        embedder: RandomEmbedder::new(
            support::stored_dimensions(db, "articles", "embedding").await?,
        ),
    };
    info!(
        "{} bounds: {} articles, {}-dimensional embeddings",
        NAME,
        handlers.articles,
        handlers.embedder.dimensions()
    );
    Ok(QueryDispatcher::new(QUERIES, handlers)?)
}

pub struct KnowledgeBaseQueries {
    articles: u64,
    embedder: RandomEmbedder,
}

#[async_trait]
impl QueryHandlers for KnowledgeBaseQueries {
    async fn run(&self, name: &str, db: &dyn Database) -> Result<u64, QueryError> {
        match name {
            "semantic_search" => self.semantic_search(db).await,
            "related_articles" => self.related_articles(db).await,
            "article_detail" => self.article_detail(db).await,
            "add_comment" => self.add_comment(db).await,
            "update_article" => self.update_article(db).await,
            other => Err(QueryError::UnknownQuery(other.to_string())),
        }
    }
}

impl KnowledgeBaseQueries {
    async fn semantic_search(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let question = text::search_phrase(&mut rand::thread_rng());
        let vector = SqlValue::Vector(self.embedder.embed_text(&question));
        let sql = format!(
            "SELECT id, title, embedding <=> {p} AS distance FROM articles \
             ORDER BY embedding <=> {p} LIMIT 5",
            p = db.placeholder(1, &vector)
        );
        let rows = db.query(&sql, &[vector]).await?;
        Ok(rows.len() as u64)
    }

    async fn related_articles(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let rows = db
            .query(
                "SELECT a.id, a.title FROM articles a \
                 WHERE a.id <> $1 \
                 ORDER BY a.embedding <=> (SELECT embedding FROM articles WHERE id = $1) \
                 LIMIT 5",
                &[support::random_id(self.articles).into()],
            )
            .await?;
        Ok(rows.len() as u64)
    }

    async fn article_detail(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let rows = db
            .query(
                "SELECT a.id, a.title, a.body, a.tags, a.view_count, au.name, \
                        (SELECT COUNT(*) FROM comments c WHERE c.article_id = a.id) \
                 FROM articles a JOIN authors au ON au.id = a.author_id \
                 WHERE a.id = $1",
                &[support::random_id(self.articles).into()],
            )
            .await?;
        Ok(rows.len() as u64)
    }

    async fn add_comment(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let (author, body) = {
            let mut rng = rand::thread_rng();
            let words = rng.gen_range(5..25);
            (text::person_name(&mut rng), text::sentence(&mut rng, words))
        };
        let affected = db
            .exec(
                "INSERT INTO comments (article_id, author_name, body, created_at) \
                 VALUES ($1, $2, $3, $4)",
                &[
                    support::random_id(self.articles).into(),
                    author.into(),
                    body.into(),
                    Utc::now().into(),
                ],
            )
            .await?;
        Ok(affected)
    }

    /// Replace the body and store the embedding of the new text.
    async fn update_article(&self, db: &dyn Database) -> Result<u64, QueryError> {
        let body = text::paragraph(&mut rand::thread_rng(), 4);
        let vector = SqlValue::Vector(self.embedder.embed_text(&body));
        let sql = format!(
            "UPDATE articles SET body = $1, embedding = {}, updated_at = $3 WHERE id = $4",
            db.placeholder(2, &vector)
        );
        let affected = db
            .exec(
                &sql,
                &[
                    body.into(),
                    vector,
                    Utc::now().into(),
                    support::random_id(self.articles).into(),
                ],
            )
            .await?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_catalogue() {
        let weights: Vec<(&str, u32)> = QUERIES.iter().map(|q| (q.name, q.weight)).collect();
        assert_eq!(
            weights,
            vec![
                ("semantic_search", 45),
                ("related_articles", 25),
                ("article_detail", 15),
                ("add_comment", 10),
                ("update_article", 5)
            ]
        );
    }

    #[test]
    fn test_article_size_hint() {
        let sizes = KnowledgeBase::new().table_sizes();
        let articles = sizes.iter().find(|t| t.name == "articles").unwrap();
        assert_eq!(articles.base_row_size, 3000);
        assert_eq!(articles.scale_ratio, 500.0);
        assert_eq!(articles.index_factor, 1.5);
        assert_eq!(articles.vector_columns, 1);
    }

    #[test]
    fn test_plan_for_ten_megabytes() {
        let plan = KnowledgeBase::new()
            .size_calculator(384)
            .calculate_row_counts(10_000_000);
        // 250*1.2*50 + 3000*1.5*500 + 400*1.3*2500 = 3,565,000 bytes per unit
        assert_eq!(plan.rows("articles"), 1500);
        assert_eq!(plan.rows("authors"), 150);
        assert_eq!(plan.rows("comments"), 7500);
    }
}
