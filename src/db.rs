//! SQLite-backed record store.
//!
//! Thin CRUD plumbing around the rules engine: rows are loaded into
//! domain structs, mutated in memory by the core modules, and written
//! back. Every multi-step mutation (complete quest, rest, buy, use item)
//! runs inside a single transaction scoped to the affected rows.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection};

use crate::character::{Character, Status};
use crate::error::ApiError;
use crate::item::{InventoryEntry, Item, DEFAULT_ITEMS};
use crate::quest::{self, CompletionOutcome, Difficulty, NewQuest, Quest, QuestType};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                level INTEGER DEFAULT 1,
                current_exp INTEGER DEFAULT 0,
                max_exp INTEGER DEFAULT 100,
                hp INTEGER DEFAULT 100,
                max_hp INTEGER DEFAULT 100,
                sp INTEGER DEFAULT 100,
                max_sp INTEGER DEFAULT 100,
                gold INTEGER DEFAULT 0,
                status TEXT DEFAULT 'normal',
                int_stat INTEGER DEFAULT 10,
                con_stat INTEGER DEFAULT 10,
                cha_stat INTEGER DEFAULT 10,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                character_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT DEFAULT '',
                difficulty TEXT DEFAULT 'normal',
                quest_type TEXT DEFAULT 'daily',
                reward_gold INTEGER DEFAULT 10,
                reward_exp INTEGER DEFAULT 10,
                sp_cost INTEGER DEFAULT 10,
                is_completed INTEGER DEFAULT 0,
                is_visible INTEGER DEFAULT 1,
                parent_quest_id INTEGER,
                step_order INTEGER DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                completed_at DATETIME,
                FOREIGN KEY(character_id) REFERENCES characters(id),
                FOREIGN KEY(parent_quest_id) REFERENCES quests(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Chain-successor lookups go through (parent_quest_id, step_order);
        // uniqueness keeps every chain strictly ordered with one quest per step
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_quests_chain
            ON quests(parent_quest_id, step_order)
            WHERE parent_quest_id IS NOT NULL
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                description TEXT DEFAULT '',
                price INTEGER DEFAULT 100,
                hp_restore INTEGER DEFAULT 0,
                sp_restore INTEGER DEFAULT 0,
                exp_multiplier INTEGER DEFAULT 1,
                is_consumable INTEGER DEFAULT 1
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                character_id INTEGER NOT NULL,
                item_id INTEGER NOT NULL,
                quantity INTEGER DEFAULT 1,
                FOREIGN KEY(character_id) REFERENCES characters(id),
                FOREIGN KEY(item_id) REFERENCES items(id),
                UNIQUE(character_id, item_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // ========================================================================
    // Characters
    // ========================================================================

    pub async fn create_character(&self, username: &str) -> Result<Character, ApiError> {
        let result = sqlx::query("INSERT INTO characters (username) VALUES (?)")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    ApiError::UsernameTaken
                }
                _ => ApiError::from(e),
            })?;

        let id = result.last_insert_rowid();
        tracing::info!("Created character '{}' (id: {})", username, id);

        let mut conn = self.pool.acquire().await?;
        load_character(&mut *conn, id)
            .await?
            .ok_or(ApiError::NotFound("character"))
    }

    /// Load a character, recomputing the derived status on the way out so a
    /// stale stored label never reaches the caller.
    pub async fn fetch_character(&self, id: i64) -> Result<Character, ApiError> {
        let mut conn = self.pool.acquire().await?;
        let mut character = load_character(&mut *conn, id)
            .await?
            .ok_or(ApiError::NotFound("character"))?;

        let stored = character.status;
        character.reclassify();
        if character.status != stored {
            sqlx::query("UPDATE characters SET status = ? WHERE id = ?")
                .bind(character.status.as_str())
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(character)
    }

    /// Refill both pools to their ceilings. Returns the character plus the
    /// (hp, sp) amounts actually restored.
    pub async fn rest(&self, character_id: i64) -> Result<(Character, i32, i32), ApiError> {
        let mut tx = self.pool.begin().await?;

        let mut character = load_character(&mut *tx, character_id)
            .await?
            .ok_or(ApiError::NotFound("character"))?;

        let (hp_restored, sp_restored) = character.rest();
        save_character(&mut *tx, &character).await?;
        tx.commit().await?;

        Ok((character, hp_restored, sp_restored))
    }

    // ========================================================================
    // Quests
    // ========================================================================

    pub async fn create_quest(
        &self,
        character_id: i64,
        new_quest: &NewQuest,
    ) -> Result<Quest, ApiError> {
        // Negative rewards or costs would let completion push sp or exp
        // outside their invariant ranges
        if new_quest.reward_gold < 0 || new_quest.reward_exp < 0 || new_quest.sp_cost < 0 {
            return Err(ApiError::Validation(
                "quest rewards and sp cost must be non-negative",
            ));
        }
        if new_quest.step_order < 1 {
            return Err(ApiError::Validation("step_order must be at least 1"));
        }

        let mut conn = self.pool.acquire().await?;

        load_character(&mut *conn, character_id)
            .await?
            .ok_or(ApiError::NotFound("character"))?;

        // Progressive reveal: later steps of a chain start hidden and are
        // revealed by the completion protocol, one at a time.
        let is_visible = new_quest.parent_quest_id.is_none() || new_quest.step_order <= 1;

        let result = sqlx::query(
            r#"
            INSERT INTO quests
                (character_id, title, description, difficulty, quest_type,
                 reward_gold, reward_exp, sp_cost, is_visible, parent_quest_id, step_order)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(character_id)
        .bind(&new_quest.title)
        .bind(&new_quest.description)
        .bind(new_quest.difficulty.as_str())
        .bind(new_quest.quest_type.as_str())
        .bind(new_quest.reward_gold)
        .bind(new_quest.reward_exp)
        .bind(new_quest.sp_cost)
        .bind(is_visible)
        .bind(new_quest.parent_quest_id)
        .bind(new_quest.step_order)
        .execute(&mut *conn)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::DuplicateStep
            }
            _ => ApiError::from(e),
        })?;

        let id = result.last_insert_rowid();
        tracing::info!(
            "Created quest '{}' (id: {}) for character {}",
            new_quest.title,
            id,
            character_id
        );

        load_quest(&mut *conn, id)
            .await?
            .ok_or(ApiError::NotFound("quest"))
    }

    /// Quests the character can currently see, in creation order. Hidden
    /// chain steps are excluded until their predecessor completes.
    pub async fn visible_quests(&self, character_id: i64) -> Result<Vec<Quest>, ApiError> {
        let rows = sqlx::query(
            "SELECT * FROM quests WHERE character_id = ? AND is_visible = 1 ORDER BY id",
        )
        .bind(character_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(quest_from_row).collect())
    }

    /// Run the completion protocol for a quest: precondition checks, payout,
    /// level-up resolution, sp debit, reclassification, and chain unlock,
    /// all inside one transaction.
    pub async fn complete_quest(&self, quest_id: i64) -> Result<CompletionOutcome, ApiError> {
        let mut tx = self.pool.begin().await?;

        let mut quest = load_quest(&mut *tx, quest_id)
            .await?
            .ok_or(ApiError::NotFound("quest"))?;
        let mut character = load_character(&mut *tx, quest.character_id)
            .await?
            .ok_or(ApiError::NotFound("character"))?;

        let mut outcome = quest::complete(&mut quest, &mut character, Utc::now().naive_utc())?;

        sqlx::query("UPDATE quests SET is_completed = 1, completed_at = ? WHERE id = ?")
            .bind(quest.completed_at)
            .bind(quest.id)
            .execute(&mut *tx)
            .await?;
        save_character(&mut *tx, &character).await?;

        // Reveal the next step of the chain, if there is one. Absence just
        // means the chain is finished.
        if let Some(parent_id) = quest.parent_quest_id {
            let next = sqlx::query(
                "SELECT id FROM quests WHERE parent_quest_id = ? AND step_order = ?",
            )
            .bind(parent_id)
            .bind(quest.step_order + 1)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(row) = next {
                let next_id: i64 = row.get("id");
                sqlx::query("UPDATE quests SET is_visible = 1 WHERE id = ?")
                    .bind(next_id)
                    .execute(&mut *tx)
                    .await?;
                outcome.next_quest_unlocked = true;
                tracing::info!("Quest {} completed, unlocked chain step {}", quest.id, next_id);
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    // ========================================================================
    // Items & Inventory
    // ========================================================================

    /// Insert the default item catalog, skipping names already present.
    /// Returns how many items were added.
    pub async fn seed_items(&self) -> Result<u64, ApiError> {
        let mut added = 0;
        for (name, description, price, hp_restore, sp_restore, exp_multiplier) in DEFAULT_ITEMS {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO items
                    (name, description, price, hp_restore, sp_restore, exp_multiplier)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(name)
            .bind(description)
            .bind(price)
            .bind(hp_restore)
            .bind(sp_restore)
            .bind(exp_multiplier)
            .execute(&self.pool)
            .await?;
            added += result.rows_affected();
        }
        if added > 0 {
            tracing::info!("Seeded {} catalog item(s)", added);
        }
        Ok(added)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        let rows = sqlx::query("SELECT * FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(item_from_row).collect())
    }

    pub async fn list_inventory(&self, character_id: i64) -> Result<Vec<InventoryEntry>, ApiError> {
        let rows = sqlx::query(
            r#"
            SELECT inv.id AS inv_id, inv.character_id, inv.item_id, inv.quantity,
                   i.name, i.description, i.price, i.hp_restore, i.sp_restore,
                   i.exp_multiplier, i.is_consumable
            FROM inventory inv
            JOIN items i ON i.id = inv.item_id
            WHERE inv.character_id = ?
            ORDER BY inv.id
            "#,
        )
        .bind(character_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| InventoryEntry {
                id: r.get("inv_id"),
                character_id: r.get("character_id"),
                item_id: r.get("item_id"),
                quantity: r.get("quantity"),
                item: Item {
                    id: r.get("item_id"),
                    name: r.get("name"),
                    description: r.get("description"),
                    price: r.get("price"),
                    hp_restore: r.get("hp_restore"),
                    sp_restore: r.get("sp_restore"),
                    exp_multiplier: r.get("exp_multiplier"),
                    is_consumable: r.get("is_consumable"),
                },
            })
            .collect())
    }

    /// Buy one unit of an item: debit the price from the character's gold
    /// and bump (or create) the inventory entry. Returns the item, the
    /// remaining gold, and the new quantity.
    pub async fn buy_item(
        &self,
        character_id: i64,
        item_id: i64,
    ) -> Result<(Item, i32, i32), ApiError> {
        let mut tx = self.pool.begin().await?;

        let mut character = load_character(&mut *tx, character_id)
            .await?
            .ok_or(ApiError::NotFound("character"))?;
        let item = load_item(&mut *tx, item_id)
            .await?
            .ok_or(ApiError::NotFound("item"))?;

        if character.gold < item.price {
            return Err(ApiError::InsufficientGold);
        }

        character.gold -= item.price;
        save_character(&mut *tx, &character).await?;

        sqlx::query(
            r#"
            INSERT INTO inventory (character_id, item_id, quantity) VALUES (?, ?, 1)
            ON CONFLICT(character_id, item_id) DO UPDATE SET quantity = quantity + 1
            "#,
        )
        .bind(character_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        let quantity: i32 =
            sqlx::query("SELECT quantity FROM inventory WHERE character_id = ? AND item_id = ?")
                .bind(character_id)
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await?
                .get("quantity");

        tx.commit().await?;
        Ok((item, character.gold, quantity))
    }

    /// Consume one unit of an item, restoring hp and sp clamped to their
    /// ceilings. Returns the item and the (hp, sp) changes actually applied.
    pub async fn use_item(
        &self,
        character_id: i64,
        item_id: i64,
    ) -> Result<(Item, i32, i32), ApiError> {
        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query(
            "SELECT id, quantity FROM inventory WHERE character_id = ? AND item_id = ?",
        )
        .bind(character_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (entry_id, quantity): (i64, i32) = match entry {
            Some(row) => (row.get("id"), row.get("quantity")),
            None => return Err(ApiError::InsufficientItem),
        };
        if quantity <= 0 {
            return Err(ApiError::InsufficientItem);
        }

        let mut character = load_character(&mut *tx, character_id)
            .await?
            .ok_or(ApiError::NotFound("character"))?;
        let item = load_item(&mut *tx, item_id)
            .await?
            .ok_or(ApiError::NotFound("item"))?;

        let (hp_change, sp_change) = character.restore(item.hp_restore, item.sp_restore);

        sqlx::query("UPDATE inventory SET quantity = quantity - 1 WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        save_character(&mut *tx, &character).await?;
        tx.commit().await?;

        Ok((item, hp_change, sp_change))
    }
}

// ============================================================================
// Row mapping & shared statements
// ============================================================================

fn character_from_row(row: &SqliteRow) -> Character {
    Character {
        id: row.get("id"),
        username: row.get("username"),
        level: row.get("level"),
        current_exp: row.get("current_exp"),
        max_exp: row.get("max_exp"),
        hp: row.get("hp"),
        max_hp: row.get("max_hp"),
        sp: row.get("sp"),
        max_sp: row.get("max_sp"),
        gold: row.get("gold"),
        status: Status::parse(row.get("status")),
        int_stat: row.get("int_stat"),
        con_stat: row.get("con_stat"),
        cha_stat: row.get("cha_stat"),
    }
}

fn quest_from_row(row: &SqliteRow) -> Quest {
    Quest {
        id: row.get("id"),
        character_id: row.get("character_id"),
        title: row.get("title"),
        description: row.get("description"),
        difficulty: Difficulty::parse(row.get("difficulty")),
        quest_type: QuestType::parse(row.get("quest_type")),
        reward_gold: row.get("reward_gold"),
        reward_exp: row.get("reward_exp"),
        sp_cost: row.get("sp_cost"),
        is_completed: row.get("is_completed"),
        is_visible: row.get("is_visible"),
        parent_quest_id: row.get("parent_quest_id"),
        step_order: row.get("step_order"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    }
}

fn item_from_row(row: &SqliteRow) -> Item {
    Item {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        hp_restore: row.get("hp_restore"),
        sp_restore: row.get("sp_restore"),
        exp_multiplier: row.get("exp_multiplier"),
        is_consumable: row.get("is_consumable"),
    }
}

async fn load_character(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Character>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM characters WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.as_ref().map(character_from_row))
}

async fn load_quest(conn: &mut SqliteConnection, id: i64) -> Result<Option<Quest>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM quests WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.as_ref().map(quest_from_row))
}

async fn load_item(conn: &mut SqliteConnection, id: i64) -> Result<Option<Item>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM items WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.as_ref().map(item_from_row))
}

async fn save_character(
    conn: &mut SqliteConnection,
    character: &Character,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE characters SET
            level = ?, current_exp = ?, max_exp = ?, hp = ?, max_hp = ?,
            sp = ?, max_sp = ?, gold = ?, status = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?"#,
    )
    .bind(character.level)
    .bind(character.current_exp)
    .bind(character.max_exp)
    .bind(character.hp)
    .bind(character.max_hp)
    .bind(character.sp)
    .bind(character.max_sp)
    .bind(character.gold)
    .bind(character.status.as_str())
    .bind(character.id)
    .execute(conn)
    .await?;

    Ok(())
}
