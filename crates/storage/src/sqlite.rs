use rusqlite::{Connection, OptionalExtension};

use xformstack_core::{
    attr_value::{AttrValue, ValueType},
    ids::*,
    time_code::TimeCode,
    xform_op::{INVERT_PREFIX, OpKind, Precision, RESET_XFORM_STACK, XFORM_OP_ORDER, XformOp},
};

use crate::error::StorageError;
use crate::traits::{AttributeRecord, Editability, SceneStore};

fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn encode(value: &AttrValue) -> Result<Vec<u8>, StorageError> {
    value
        .to_msgpack()
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<AttrValue, StorageError> {
    AttrValue::from_msgpack(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn read_attribute(
    conn: &Connection,
    entity_id: EntityId,
    name: &str,
) -> Result<Option<AttributeRecord>, StorageError> {
    let row = conn
        .query_row(
            "SELECT value_type, locked FROM attributes WHERE entity_id = ?1 AND name = ?2",
            rusqlite::params![entity_id.as_bytes().as_slice(), name],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
        )
        .optional()?;
    match row {
        Some((value_type, locked)) => Ok(Some(AttributeRecord {
            entity_id,
            name: name.to_string(),
            value_type: ValueType::parse(&value_type)?,
            locked,
        })),
        None => Ok(None),
    }
}

fn insert_attribute(
    conn: &Connection,
    entity_id: EntityId,
    name: &str,
    value_type: ValueType,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO attributes (entity_id, name, value_type) VALUES (?1, ?2, ?3)",
        rusqlite::params![entity_id.as_bytes().as_slice(), name, value_type.as_str()],
    )?;
    Ok(())
}

fn read_order_tokens(
    conn: &Connection,
    entity_id: EntityId,
) -> Result<Option<Vec<String>>, StorageError> {
    let bytes: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT default_value FROM attributes WHERE entity_id = ?1 AND name = ?2",
            rusqlite::params![entity_id.as_bytes().as_slice(), XFORM_OP_ORDER],
            |row| row.get(0),
        )
        .optional()?;
    match bytes.flatten() {
        Some(bytes) => match decode(&bytes)? {
            AttrValue::TokenArray(tokens) => Ok(Some(tokens)),
            other => Err(StorageError::TypeMismatch {
                attr: XFORM_OP_ORDER.to_string(),
                declared: ValueType::TokenArray.as_str().to_string(),
                actual: format!("{other:?}"),
            }),
        },
        None => Ok(None),
    }
}

fn write_order_tokens(
    conn: &Connection,
    entity_id: EntityId,
    tokens: Vec<String>,
) -> Result<(), StorageError> {
    if read_attribute(conn, entity_id, XFORM_OP_ORDER)?.is_none() {
        insert_attribute(conn, entity_id, XFORM_OP_ORDER, ValueType::TokenArray)?;
    }
    let bytes = encode(&AttrValue::TokenArray(tokens))?;
    conn.execute(
        "UPDATE attributes SET default_value = ?1 WHERE entity_id = ?2 AND name = ?3",
        rusqlite::params![bytes, entity_id.as_bytes().as_slice(), XFORM_OP_ORDER],
    )?;
    Ok(())
}

pub struct SqliteSceneStore {
    conn: Connection,
}

impl SqliteSceneStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// All entities, ordered by path.
    pub fn entities(&self) -> Result<Vec<(EntityId, String)>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity_id, path FROM entities ORDER BY path")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut result = Vec::new();
        for row in rows {
            let (id_bytes, path) = row?;
            result.push((EntityId::from_bytes(to_array::<16>(id_bytes, "entity_id")?), path));
        }
        Ok(result)
    }

    fn is_read_only(&self) -> Result<bool, StorageError> {
        let read_only: bool =
            self.conn
                .query_row("SELECT read_only FROM layer_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
        Ok(read_only)
    }

    fn require_entity(&self, entity_id: EntityId) -> Result<(), StorageError> {
        match self.entity_path(entity_id)? {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("entity {entity_id}"))),
        }
    }
}

impl SceneStore for SqliteSceneStore {
    fn create_entity(&mut self, path: &str) -> Result<EntityId, StorageError> {
        let entity_id = EntityId::new();
        let result = self.conn.execute(
            "INSERT INTO entities (entity_id, path) VALUES (?1, ?2)",
            rusqlite::params![entity_id.as_bytes().as_slice(), path],
        );
        match result {
            Ok(_) => Ok(entity_id),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::EntityCollision {
                    path: path.to_string(),
                })
            }
            Err(e) => Err(StorageError::Sqlite(e)),
        }
    }

    fn entity_path(&self, entity_id: EntityId) -> Result<Option<String>, StorageError> {
        let path = self
            .conn
            .query_row(
                "SELECT path FROM entities WHERE entity_id = ?1",
                rusqlite::params![entity_id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path)
    }

    fn get_attribute(
        &self,
        entity_id: EntityId,
        name: &str,
    ) -> Result<Option<AttributeRecord>, StorageError> {
        read_attribute(&self.conn, entity_id, name)
    }

    fn create_attribute(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value_type: ValueType,
    ) -> Result<bool, StorageError> {
        self.require_entity(entity_id)?;
        if self.is_read_only()? {
            return Ok(false);
        }
        match read_attribute(&self.conn, entity_id, name)? {
            Some(existing) => Ok(existing.value_type == value_type),
            None => {
                insert_attribute(&self.conn, entity_id, name, value_type)?;
                Ok(true)
            }
        }
    }

    fn remove_attribute(&mut self, entity_id: EntityId, name: &str) -> Result<bool, StorageError> {
        if self.is_read_only()? {
            return Ok(false);
        }
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM time_samples WHERE entity_id = ?1 AND name = ?2",
            rusqlite::params![entity_id.as_bytes().as_slice(), name],
        )?;
        let removed = tx.execute(
            "DELETE FROM attributes WHERE entity_id = ?1 AND name = ?2",
            rusqlite::params![entity_id.as_bytes().as_slice(), name],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn get_value(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<AttrValue>, StorageError> {
        if let Some(t) = time.sample() {
            // Held interpolation: last sample at or before t, else the first.
            let held: Option<Vec<u8>> = self
                .conn
                .query_row(
                    "SELECT value FROM time_samples WHERE entity_id = ?1 AND name = ?2
                     ORDER BY (time <= ?3) DESC,
                              CASE WHEN time <= ?3 THEN -time ELSE time END
                     LIMIT 1",
                    rusqlite::params![entity_id.as_bytes().as_slice(), name, t],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(bytes) = held {
                return Ok(Some(decode(&bytes)?));
            }
        }
        self.get_authored_value(entity_id, name, TimeCode::Default)
    }

    fn get_authored_value(
        &self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<AttrValue>, StorageError> {
        let bytes: Option<Option<Vec<u8>>> = match time {
            TimeCode::Default => self
                .conn
                .query_row(
                    "SELECT default_value FROM attributes WHERE entity_id = ?1 AND name = ?2",
                    rusqlite::params![entity_id.as_bytes().as_slice(), name],
                    |row| row.get(0),
                )
                .optional()?,
            TimeCode::At(t) => self
                .conn
                .query_row(
                    "SELECT value FROM time_samples WHERE entity_id = ?1 AND name = ?2 AND time = ?3",
                    rusqlite::params![entity_id.as_bytes().as_slice(), name, t],
                    |row| row.get(0),
                )
                .optional()?,
        };
        bytes.flatten().map(|b| decode(&b)).transpose()
    }

    fn set_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        value: &AttrValue,
        time: TimeCode,
    ) -> Result<bool, StorageError> {
        if self.is_read_only()? {
            return Ok(false);
        }
        let Some(attr) = read_attribute(&self.conn, entity_id, name)? else {
            return Ok(false);
        };
        let Some(actual) = value.value_type() else {
            return Ok(false);
        };
        if actual != attr.value_type {
            return Err(StorageError::TypeMismatch {
                attr: name.to_string(),
                declared: attr.value_type.as_str().to_string(),
                actual: actual.as_str().to_string(),
            });
        }
        let bytes = encode(value)?;
        match time {
            TimeCode::Default => {
                self.conn.execute(
                    "UPDATE attributes SET default_value = ?1 WHERE entity_id = ?2 AND name = ?3",
                    rusqlite::params![bytes, entity_id.as_bytes().as_slice(), name],
                )?;
            }
            TimeCode::At(t) => {
                self.conn.execute(
                    "INSERT INTO time_samples (entity_id, name, time, value) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(entity_id, name, time) DO UPDATE SET value = excluded.value",
                    rusqlite::params![entity_id.as_bytes().as_slice(), name, t, bytes],
                )?;
            }
        }
        Ok(true)
    }

    fn clear_value(
        &mut self,
        entity_id: EntityId,
        name: &str,
        time: TimeCode,
    ) -> Result<bool, StorageError> {
        if self.is_read_only()? {
            return Ok(false);
        }
        if read_attribute(&self.conn, entity_id, name)?.is_none() {
            return Ok(false);
        }
        match time {
            TimeCode::Default => {
                self.conn.execute(
                    "UPDATE attributes SET default_value = NULL WHERE entity_id = ?1 AND name = ?2",
                    rusqlite::params![entity_id.as_bytes().as_slice(), name],
                )?;
            }
            TimeCode::At(t) => {
                self.conn.execute(
                    "DELETE FROM time_samples WHERE entity_id = ?1 AND name = ?2 AND time = ?3",
                    rusqlite::params![entity_id.as_bytes().as_slice(), name, t],
                )?;
            }
        }
        Ok(true)
    }

    fn get_ordered_ops(&self, entity_id: EntityId) -> Result<(Vec<XformOp>, bool), StorageError> {
        self.require_entity(entity_id)?;
        let Some(tokens) = read_order_tokens(&self.conn, entity_id)? else {
            return Ok((Vec::new(), false));
        };

        let mut resets = false;
        let mut ops = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if token == RESET_XFORM_STACK {
                resets |= i == 0;
                continue;
            }
            let attr_name = token.strip_prefix(INVERT_PREFIX).unwrap_or(token);
            let attr = read_attribute(&self.conn, entity_id, attr_name)?.ok_or_else(|| {
                StorageError::NotFound(format!("op attribute {attr_name} on {entity_id}"))
            })?;
            ops.push(XformOp::parse_token(token, attr.value_type.precision())?);
        }
        Ok((ops, resets))
    }

    fn set_ordered_ops(
        &mut self,
        entity_id: EntityId,
        ops: &[XformOp],
        resets_xform_stack: bool,
    ) -> Result<bool, StorageError> {
        self.require_entity(entity_id)?;
        if self.is_read_only()? {
            return Ok(false);
        }
        let mut tokens = Vec::with_capacity(ops.len() + 1);
        if resets_xform_stack {
            tokens.push(RESET_XFORM_STACK.to_string());
        }
        tokens.extend(ops.iter().map(XformOp::op_name));

        let tx = self.conn.transaction()?;
        write_order_tokens(&tx, entity_id, tokens)?;
        tx.commit()?;
        Ok(true)
    }

    fn add_xform_op(
        &mut self,
        entity_id: EntityId,
        kind: OpKind,
        precision: Precision,
        suffix: Option<&str>,
        is_inverse: bool,
    ) -> Result<Option<XformOp>, StorageError> {
        self.require_entity(entity_id)?;
        if self.is_read_only()? {
            return Ok(None);
        }
        if read_attribute(&self.conn, entity_id, XFORM_OP_ORDER)?.is_some_and(|a| a.locked) {
            tracing::debug!("op order on {entity_id} is locked, not adding {}", kind.token());
            return Ok(None);
        }

        let op = XformOp::new(kind, precision, suffix, is_inverse);
        let mut tokens = read_order_tokens(&self.conn, entity_id)?.unwrap_or_default();
        let op_name = op.op_name();
        if tokens.contains(&op_name) {
            tracing::debug!("{op_name} already in the op order of {entity_id}");
            return Ok(None);
        }

        let tx = self.conn.transaction()?;
        match read_attribute(&tx, entity_id, op.attr_name())? {
            Some(attr) if attr.value_type != op.value_type() => {
                tracing::debug!(
                    "{} exists as {}, cannot add as {}",
                    op.attr_name(),
                    attr.value_type.as_str(),
                    op.value_type().as_str()
                );
                return Ok(None);
            }
            Some(_) => {}
            None => insert_attribute(&tx, entity_id, op.attr_name(), op.value_type())?,
        }
        tokens.push(op_name);
        write_order_tokens(&tx, entity_id, tokens)?;
        tx.commit()?;
        Ok(Some(op))
    }

    fn is_editable(&self, entity_id: EntityId, name: &str) -> Result<Editability, StorageError> {
        let target = self.edit_target_editability()?;
        if !target.allowed {
            return Ok(target);
        }
        match read_attribute(&self.conn, entity_id, name)? {
            Some(attr) if attr.locked => Ok(Editability::denied(format!(
                "Cannot edit [{name}] attribute because its lock status is 'locked'."
            ))),
            _ => Ok(Editability::allowed()),
        }
    }

    fn set_attribute_locked(
        &mut self,
        entity_id: EntityId,
        name: &str,
        locked: bool,
    ) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE attributes SET locked = ?1 WHERE entity_id = ?2 AND name = ?3",
            rusqlite::params![locked, entity_id.as_bytes().as_slice(), name],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("attribute {name} on {entity_id}")));
        }
        Ok(())
    }

    fn is_instance_proxy(&self, entity_id: EntityId) -> Result<bool, StorageError> {
        let proxy = self
            .conn
            .query_row(
                "SELECT instance_proxy FROM entities WHERE entity_id = ?1",
                rusqlite::params![entity_id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        proxy.ok_or_else(|| StorageError::NotFound(format!("entity {entity_id}")))
    }

    fn set_instance_proxy(&mut self, entity_id: EntityId, proxy: bool) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE entities SET instance_proxy = ?1 WHERE entity_id = ?2",
            rusqlite::params![proxy, entity_id.as_bytes().as_slice()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("entity {entity_id}")));
        }
        Ok(())
    }

    fn edit_target_editability(&self) -> Result<Editability, StorageError> {
        if self.is_read_only()? {
            Ok(Editability::denied(
                "Cannot edit: the current edit target layer is read-only.",
            ))
        } else {
            Ok(Editability::allowed())
        }
    }

    fn set_read_only(&mut self, read_only: bool) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE layer_state SET read_only = ?1 WHERE id = 1",
            rusqlite::params![read_only],
        )?;
        Ok(())
    }
}
