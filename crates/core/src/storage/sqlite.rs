//! SQLite store
//!
//! Polls keep their list order in a `position` column. Each whole
//! collection replace runs in a single transaction.

use std::path::Path;

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::migrations;
use super::parse::{parse_count, parse_datetime, parse_datetime_opt, parse_options};
use super::Store;
use crate::error::Result;
use crate::models::{Poll, PollId, VoteBook, VoteRecord};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::schema_version(&self.conn)
    }
}

fn poll_from_row(row: &Row<'_>) -> rusqlite::Result<Poll> {
    Ok(Poll {
        id: PollId(row.get(0)?),
        question: row.get(1)?,
        options: parse_options(2, &row.get::<_, String>(2)?)?,
        total_votes: parse_count(3, row.get(3)?)?,
        created_at: parse_datetime(4, &row.get::<_, String>(4)?)?,
        expires_at: parse_datetime_opt(5, row.get(5)?)?,
        expired: row.get::<_, i32>(6)? != 0,
    })
}

impl Store for SqliteStore {
    fn load_polls(&self) -> Result<Vec<Poll>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question, options_json, total_votes, created_at, expires_at, expired
             FROM polls ORDER BY position ASC",
        )?;

        let polls = stmt
            .query_map([], poll_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(polls)
    }

    #[instrument(skip(self, polls), fields(count = polls.len()))]
    fn save_all_polls(&mut self, polls: &[Poll]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM polls", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO polls (id, position, question, options_json, total_votes, created_at, expires_at, expired)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (position, poll) in polls.iter().enumerate() {
                insert.execute(params![
                    poll.id.as_str(),
                    position as i64,
                    poll.question,
                    serde_json::to_string(&poll.options)?,
                    poll.total_votes as i64,
                    poll.created_at.to_rfc3339(),
                    poll.expires_at.map(|t| t.to_rfc3339()),
                    poll.expired as i32,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_votes(&self) -> Result<VoteBook> {
        let mut stmt = self
            .conn
            .prepare("SELECT poll_id, voter_id, option_index, voted_at FROM votes")?;

        let rows = stmt.query_map([], |row| {
            let option_index: i64 = row.get(2)?;
            Ok((
                PollId(row.get(0)?),
                row.get::<_, String>(1)?,
                VoteRecord {
                    option_index: parse_count(2, option_index)? as usize,
                    timestamp: parse_datetime(3, &row.get::<_, String>(3)?)?,
                },
            ))
        })?;

        let mut book = VoteBook::new();
        for row in rows {
            let (poll_id, voter_id, record) = row?;
            book.entry(poll_id).or_default().insert(voter_id, record);
        }
        Ok(book)
    }

    #[instrument(skip(self, votes), fields(polls = votes.len()))]
    fn save_all_votes(&mut self, votes: &VoteBook) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM votes", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO votes (poll_id, voter_id, option_index, voted_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (poll_id, ballots) in votes {
                for (voter_id, record) in ballots {
                    insert.execute(params![
                        poll_id.as_str(),
                        voter_id,
                        record.option_index as i64,
                        record.timestamp.to_rfc3339(),
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPoll;
    use chrono::{Duration, Utc};

    fn sample_poll(id: &str) -> Poll {
        let mut poll = Poll::new(
            id.into(),
            NewPoll::new("Tea or coffee?", vec!["Tea".into(), "Coffee".into()])
                .with_expiry(Utc::now() + Duration::hours(1)),
            Utc::now(),
        );
        poll.add_vote(1);
        poll
    }

    #[test]
    fn test_fresh_store_is_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_polls().unwrap().is_empty());
        assert!(store.load_votes().unwrap().is_empty());
        assert!(store.schema_version().unwrap() > 0);
    }

    #[test]
    fn test_poll_order_preserved() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let polls = vec![sample_poll("z"), sample_poll("a"), sample_poll("m")];
        store.save_all_polls(&polls).unwrap();

        let loaded = store.load_polls().unwrap();
        let ids: Vec<&str> = loaded.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_replace_drops_missing_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .save_all_polls(&[sample_poll("a"), sample_poll("b")])
            .unwrap();
        store.save_all_polls(&[sample_poll("b")]).unwrap();

        let loaded = store.load_polls().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id.as_str(), "b");
    }

    #[test]
    fn test_votes_grouped_by_poll() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut book = VoteBook::new();
        let now = Utc::now();
        for (poll, voter) in [("a", "v1"), ("a", "v2"), ("b", "v1")] {
            book.entry(PollId::from(poll)).or_default().insert(
                voter.to_string(),
                VoteRecord {
                    option_index: 0,
                    timestamp: now,
                },
            );
        }
        store.save_all_votes(&book).unwrap();

        let loaded = store.load_votes().unwrap();
        assert_eq!(loaded[&PollId::from("a")].len(), 2);
        assert_eq!(loaded[&PollId::from("b")].len(), 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.save_all_polls(&[sample_poll("a")]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_polls().unwrap()[0].total_votes, 1);
    }
}
