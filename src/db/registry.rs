//! Client and phone number operations.
//!
//! Every function takes the connection it runs on. Operations that issue more
//! than one statement open a transaction on that connection and only commit
//! once every statement succeeded; an early return drops the transaction,
//! which rolls it back.

use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use crate::models::{
    Client, ClientFilter, ClientId, ClientRecord, ClientUpdate, NewClient, PhoneId, PhoneNumber,
    PhoneUpdate, SearchBy,
};

/// Register a client and its initial phone numbers. Returns the new id.
pub async fn add_client(conn: &mut PgConnection, client: &NewClient) -> Result<ClientId> {
    client.validate()?;

    let mut tx = conn.begin().await?;

    let client_id = sqlx::query_scalar::<_, ClientId>(
        r#"
        INSERT INTO clients (name, surname, email)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&client.first_name)
    .bind(&client.last_name)
    .bind(&client.email)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| RegistryError::from_store(e, None, Some(&client.email)))?;

    for number in &client.phones {
        insert_phone(&mut tx, client_id, number).await?;
    }

    tx.commit().await?;

    info!(client_id, phones = client.phones.len(), "Client added");
    Ok(client_id)
}

/// Attach one more phone number to an existing client.
pub async fn add_phone(conn: &mut PgConnection, client_id: ClientId, number: &str) -> Result<PhoneId> {
    if number.trim().is_empty() {
        return Err(RegistryError::InvalidInput {
            field: "phone",
            reason: "must not be empty".to_string(),
        });
    }

    let phone_id = insert_phone(conn, client_id, number).await?;

    info!(client_id, phone_id, "Phone added");
    Ok(phone_id)
}

async fn insert_phone(conn: &mut PgConnection, client_id: ClientId, number: &str) -> Result<PhoneId> {
    let phone_id = sqlx::query_scalar::<_, PhoneId>(
        r#"
        INSERT INTO numbers (number, client_id)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(number)
    .bind(client_id)
    .fetch_one(conn)
    .await
    .map_err(|e| RegistryError::from_store(e, Some(client_id), None))?;

    Ok(phone_id)
}

/// Apply a partial update to a client as one unit of work.
pub async fn update_client(
    conn: &mut PgConnection,
    client_id: ClientId,
    update: &ClientUpdate,
) -> Result<()> {
    update.validate()?;

    let mut tx = conn.begin().await?;

    // Lock the row so the existence check holds until commit
    let locked = sqlx::query_scalar::<_, ClientId>("SELECT id FROM clients WHERE id = $1 FOR UPDATE")
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?;

    if locked.is_none() {
        return Err(RegistryError::UnknownClient { client_id });
    }

    if let Some(mut query) = client_update_query(client_id, update) {
        query
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| RegistryError::from_store(e, Some(client_id), update.email.as_deref()))?;
    }

    match &update.phones {
        Some(PhoneUpdate::OverwriteAll(number)) => {
            let overwritten = sqlx::query("UPDATE numbers SET number = $1 WHERE client_id = $2")
                .bind(number)
                .bind(client_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| RegistryError::from_store(e, Some(client_id), None))?
                .rows_affected();
            debug!(client_id, overwritten, "Phone numbers overwritten");
        }
        Some(PhoneUpdate::Replace(numbers)) => {
            let removed = sqlx::query("DELETE FROM numbers WHERE client_id = $1")
                .bind(client_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            for number in numbers {
                insert_phone(&mut tx, client_id, number).await?;
            }
            debug!(client_id, removed, added = numbers.len(), "Phone numbers replaced");
        }
        None => {}
    }

    tx.commit().await?;

    info!(client_id, "Client updated");
    Ok(())
}

/// Build the single `UPDATE clients` statement for the fields present in
/// `update`, or `None` when no client column changes.
fn client_update_query<'a>(
    client_id: ClientId,
    update: &'a ClientUpdate,
) -> Option<QueryBuilder<'a, Postgres>> {
    if !update.touches_client_row() {
        return None;
    }

    let mut query = QueryBuilder::new("UPDATE clients SET ");
    {
        let mut set = query.separated(", ");
        if let Some(first_name) = &update.first_name {
            set.push("name = ");
            set.push_bind_unseparated(first_name.as_str());
        }
        if let Some(last_name) = &update.last_name {
            set.push("surname = ");
            set.push_bind_unseparated(last_name.as_str());
        }
        if let Some(email) = &update.email {
            set.push("email = ");
            set.push_bind_unseparated(email.as_str());
        }
    }
    query.push(" WHERE id = ");
    query.push_bind(client_id);

    Some(query)
}

/// Delete the client's phone numbers matching a `LIKE` pattern (`%` any
/// run of characters, `_` exactly one). Returns how many rows went away;
/// zero means nothing matched.
pub async fn delete_phone(conn: &mut PgConnection, client_id: ClientId, pattern: &str) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM numbers WHERE client_id = $1 AND number LIKE $2")
        .bind(client_id)
        .bind(pattern)
        .execute(conn)
        .await?
        .rows_affected();

    info!(client_id, deleted, "Phone numbers deleted");
    Ok(deleted)
}

/// Delete a client and all of its phone numbers. Returns whether a client
/// existed; deleting an unknown id is a no-op.
pub async fn delete_client(conn: &mut PgConnection, client_id: ClientId) -> Result<bool> {
    let mut tx = conn.begin().await?;

    let phones = sqlx::query("DELETE FROM numbers WHERE client_id = $1")
        .bind(client_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let clients = sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(client_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    let existed = clients > 0;
    if existed {
        info!(client_id, phones, "Client deleted");
    } else {
        debug!(client_id, "Delete of unknown client ignored");
    }
    Ok(existed)
}

/// Ids of the clients matching the filter's single criterion, ascending.
pub async fn find_client(conn: &mut PgConnection, filter: &ClientFilter) -> Result<Vec<ClientId>> {
    let criterion = filter.criterion()?;

    let (sql, value) = match criterion {
        SearchBy::FirstName(v) => ("SELECT id FROM clients WHERE name = $1 ORDER BY id", v),
        SearchBy::LastName(v) => ("SELECT id FROM clients WHERE surname = $1 ORDER BY id", v),
        SearchBy::Email(v) => ("SELECT id FROM clients WHERE email = $1 ORDER BY id", v),
        SearchBy::Phone(v) => (
            "SELECT DISTINCT client_id FROM numbers WHERE number = $1 ORDER BY client_id",
            v,
        ),
    };

    let ids = sqlx::query_scalar::<_, ClientId>(sql)
        .bind(value)
        .fetch_all(conn)
        .await?;

    debug!(?criterion, matches = ids.len(), "Client search");
    Ok(ids)
}

pub async fn client_id_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<ClientId>> {
    let id = sqlx::query_scalar::<_, ClientId>("SELECT id FROM clients WHERE email = $1")
        .bind(email)
        .fetch_optional(conn)
        .await?;

    Ok(id)
}

/// Load a client together with its phone numbers.
pub async fn get_client(conn: &mut PgConnection, client_id: ClientId) -> Result<ClientRecord> {
    let client = sqlx::query_as::<_, Client>(
        r#"
        SELECT id, name AS first_name, surname AS last_name, email
        FROM clients
        WHERE id = $1
        "#,
    )
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RegistryError::UnknownClient { client_id })?;

    let phones = list_phones(conn, client_id).await?;

    Ok(ClientRecord { client, phones })
}

pub async fn list_phones(conn: &mut PgConnection, client_id: ClientId) -> Result<Vec<PhoneNumber>> {
    let phones = sqlx::query_as::<_, PhoneNumber>(
        "SELECT id, number, client_id FROM numbers WHERE client_id = $1 ORDER BY id",
    )
    .bind(client_id)
    .fetch_all(conn)
    .await?;

    Ok(phones)
}
