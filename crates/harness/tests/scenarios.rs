use xformstack_core::{
    attr_value::AttrValue,
    math::Vector3d,
    time_code::TimeCode,
    xform_op::XFORM_OP_ORDER,
    CoreError,
};
use xformstack_engine::{CommandState, EngineError, UndoResult, UndoableCommand};
use xformstack_harness::{FaultyStore, TestScene};
use xformstack_storage::{SceneStore, SqliteSceneStore};

// ============================================================================
// Rotation edits
// ============================================================================

#[test]
fn rotate_on_empty_entity_creates_rotate_xyz() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    let stack = scene.stack(id);

    let cmd = stack
        .rotate_cmd(scene.store(), Vector3d::new(10.0, 20.0, 30.0))?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;

    assert_eq!(scene.op_names(id)?, vec!["xformOp:rotateXYZ"]);
    let r = stack.rotation(scene.store())?;
    assert!(r.approx_eq(&Vector3d::new(10.0, 20.0, 30.0), 1e-4), "{r:?}");
    Ok(())
}

#[test]
fn rotate_reuses_existing_single_axis_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    scene.author_ops(id, &["xformOp:rotateX"])?;
    let stack = scene.stack(id);

    let cmd = stack
        .rotate_cmd(scene.store(), Vector3d::new(5.0, 0.0, 0.0))?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;

    assert_eq!(scene.op_names(id)?, vec!["xformOp:rotateX"]);
    assert_eq!(
        scene
            .store()
            .get_value(id, "xformOp:rotateX", TimeCode::Default)?,
        Some(AttrValue::Float(5.0))
    );
    assert_eq!(stack.rotation(scene.store())?, Vector3d::new(5.0, 0.0, 0.0));
    Ok(())
}

#[test]
fn rotate_converts_into_authored_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    scene.author_ops(id, &["xformOp:rotateZYX"])?;
    let stack = scene.stack(id);
    let wanted = Vector3d::new(10.0, 20.0, 30.0);

    let cmd = stack
        .rotate_cmd(scene.store(), wanted)?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;

    let stored = scene
        .store()
        .get_value(id, "xformOp:rotateZYX", TimeCode::Default)?
        .and_then(|v| v.as_vec3())
        .ok_or("no stored rotation")?;
    assert!(!stored.approx_eq(&wanted, 1e-3));
    assert!(stack.rotation(scene.store())?.approx_eq(&wanted, 1e-3));
    Ok(())
}

#[test]
fn orient_rotation_fails_without_writing() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    scene.author_ops(id, &["xformOp:translate", "xformOp:orient"])?;
    let before = scene.op_names(id)?;
    let stack = scene.stack(id);

    let result = stack.rotate_cmd(scene.store(), Vector3d::new(1.0, 2.0, 3.0));
    assert!(matches!(
        result,
        Err(EngineError::Core(CoreError::UnsupportedEncoding(_)))
    ));
    assert_eq!(scene.op_names(id)?, before);
    assert_eq!(
        scene
            .store()
            .get_value(id, "xformOp:orient", TimeCode::Default)?,
        None
    );
    assert_eq!(scene.event_count(), 0);
    Ok(())
}

// ============================================================================
// Pivot pairs
// ============================================================================

#[test]
fn scale_pivot_undo_restores_order_exactly() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    scene.author_ops(id, &["xformOp:translate", "xformOp:scale"])?;
    let order_before = scene
        .store()
        .get_value(id, XFORM_OP_ORDER, TimeCode::Default)?;
    let stack = scene.stack(id);

    let cmd = stack
        .scale_pivot_cmd(scene.store(), Vector3d::new(1.0, 2.0, 3.0))?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;
    assert_eq!(
        scene.op_names(id)?,
        vec![
            "xformOp:translate",
            "xformOp:translate:scalePivot",
            "xformOp:scale",
            "!invert!xformOp:translate:scalePivot",
        ]
    );
    assert_eq!(stack.scale_pivot(scene.store())?, Vector3d::new(1.0, 2.0, 3.0));

    assert_eq!(scene.engine.undo()?, UndoResult::Applied);
    assert_eq!(scene.op_names(id)?, vec!["xformOp:translate", "xformOp:scale"]);
    assert_eq!(
        scene
            .store()
            .get_value(id, XFORM_OP_ORDER, TimeCode::Default)?,
        order_before
    );
    assert!(scene
        .store()
        .get_attribute(id, "xformOp:translate:scalePivot")?
        .is_none());
    Ok(())
}

#[test]
fn pivot_pair_is_created_in_one_notification() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    let stack = scene.stack(id);

    let cmd = stack
        .rotate_pivot_cmd(scene.store(), Vector3d::new(0.0, 1.0, 0.0))?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;

    assert_eq!(scene.event_count(), 1);
    assert_eq!(
        scene.op_names(id)?,
        vec![
            "xformOp:translate:rotatePivot",
            "!invert!xformOp:translate:rotatePivot",
        ]
    );
    Ok(())
}

#[test]
fn refused_inverse_leaves_no_half_pair() -> Result<(), Box<dyn std::error::Error>> {
    let store = FaultyStore::new(SqliteSceneStore::open_in_memory()?);
    let mut scene = TestScene::with_store(store);
    let id = scene.create_entity("/world/cube")?;
    scene.author_ops(id, &["xformOp:translate"])?;
    scene.store_mut().refuse_add_at(1);
    let stack = scene.stack(id);

    let cmd = stack
        .scale_pivot_cmd(scene.store(), Vector3d::new(1.0, 1.0, 1.0))?
        .ok_or("edit refused")?;
    let result = scene.engine.execute(Box::new(cmd));

    assert!(matches!(result, Err(EngineError::StructuralFailure(_))));
    assert_eq!(scene.op_names(id)?, vec!["xformOp:translate"]);
    assert!(scene
        .store()
        .get_attribute(id, "xformOp:translate:scalePivot")?
        .is_none());
    assert_eq!(scene.engine.undo_manager().undo_depth(), 0);
    Ok(())
}

#[test]
fn refused_reorder_rolls_back_creation() -> Result<(), Box<dyn std::error::Error>> {
    let store = FaultyStore::new(SqliteSceneStore::open_in_memory()?);
    let mut scene = TestScene::with_store(store);
    let id = scene.create_entity("/world/cube")?;
    scene.store_mut().refuse_reorder = true;
    let stack = scene.stack(id);

    let cmd = stack
        .translate_cmd(scene.store(), Vector3d::new(1.0, 1.0, 1.0))?
        .ok_or("edit refused")?;
    let result = scene.engine.execute(Box::new(cmd));

    assert!(matches!(result, Err(EngineError::StructuralFailure(_))));
    assert!(scene.op_names(id)?.is_empty());
    assert!(scene.store().get_attribute(id, "xformOp:translate")?.is_none());
    assert!(scene.store().get_attribute(id, XFORM_OP_ORDER)?.is_none());

    scene.store_mut().heal();
    let cmd = stack
        .translate_cmd(scene.store(), Vector3d::new(1.0, 1.0, 1.0))?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;
    assert_eq!(scene.op_names(id)?, vec!["xformOp:translate"]);
    Ok(())
}

#[test]
fn refused_undo_keeps_the_created_op_undoable() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    let stack = scene.stack(id);

    let cmd = stack
        .translate_cmd(scene.store(), Vector3d::new(1.0, 2.0, 3.0))?
        .ok_or("edit refused")?;
    scene.engine.execute(Box::new(cmd))?;

    scene.store_mut().set_read_only(true)?;
    let result = scene.engine.undo();
    assert!(matches!(result, Err(EngineError::StructuralFailure(_))));
    assert_eq!(scene.op_names(id)?, vec!["xformOp:translate"]);
    assert_eq!(
        stack.translation(scene.store())?,
        Vector3d::new(1.0, 2.0, 3.0)
    );
    assert_eq!(scene.engine.undo_manager().undo_depth(), 1);

    scene.store_mut().set_read_only(false)?;
    assert_eq!(scene.engine.undo()?, UndoResult::Applied);
    assert!(scene.op_names(id)?.is_empty());
    assert!(scene.store().get_attribute(id, "xformOp:translate")?.is_none());
    assert!(scene.store().get_attribute(id, XFORM_OP_ORDER)?.is_none());

    // A full redo/undo cycle still removes the op.
    scene.engine.redo()?;
    assert_eq!(scene.op_names(id)?, vec!["xformOp:translate"]);
    scene.engine.undo()?;
    assert!(scene.op_names(id)?.is_empty());
    Ok(())
}

#[test]
fn refused_write_through_leaves_the_command_committed() -> Result<(), Box<dyn std::error::Error>>
{
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    let stack = scene.stack(id);

    let mut cmd = stack
        .scale_cmd(scene.store(), Vector3d::new(2.0, 2.0, 2.0))?
        .ok_or("edit refused")?;
    UndoableCommand::<SqliteSceneStore>::execute(&mut cmd, &mut scene.engine)?;

    scene.store_mut().set_read_only(true)?;
    let result = cmd.set(&mut scene.engine, Vector3d::new(3.0, 3.0, 3.0));
    assert!(matches!(result, Err(EngineError::StructuralFailure(_))));
    let result = UndoableCommand::<SqliteSceneStore>::undo(&mut cmd, &mut scene.engine);
    assert!(matches!(result, Err(EngineError::StructuralFailure(_))));
    assert_eq!(cmd.state(), CommandState::Committed);

    scene.store_mut().set_read_only(false)?;
    UndoableCommand::<SqliteSceneStore>::undo(&mut cmd, &mut scene.engine)?;
    assert_eq!(cmd.state(), CommandState::Undone);
    assert!(scene.op_names(id)?.is_empty());
    Ok(())
}

// ============================================================================
// Undo before commit
// ============================================================================

#[test]
fn undo_before_commit_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    let id = scene.create_entity("/world/cube")?;
    scene.author_ops(id, &["xformOp:scale"])?;
    let stack = scene.stack(id);

    let mut cmd = stack
        .translate_cmd(scene.store(), Vector3d::new(4.0, 5.0, 6.0))?
        .ok_or("edit refused")?;
    assert_eq!(cmd.state(), CommandState::Pending);

    UndoableCommand::<SqliteSceneStore>::undo(&mut cmd, &mut scene.engine)?;
    assert_eq!(cmd.state(), CommandState::Pending);
    assert_eq!(scene.op_names(id)?, vec!["xformOp:scale"]);
    assert_eq!(scene.event_count(), 0);

    UndoableCommand::<SqliteSceneStore>::execute(&mut cmd, &mut scene.engine)?;
    assert_eq!(cmd.state(), CommandState::Committed);
    assert_eq!(
        stack.translation(scene.store())?,
        Vector3d::new(4.0, 5.0, 6.0)
    );
    Ok(())
}

#[test]
fn undo_on_empty_history_is_empty() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = TestScene::new()?;
    assert_eq!(scene.engine.undo()?, UndoResult::Empty);
    assert_eq!(scene.engine.redo()?, UndoResult::Empty);
    Ok(())
}
