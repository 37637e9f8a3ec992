mod workcell;

pub use workcell::{
    create_workcell_scene, create_workcell_template, ProceduralSceneLoader, ROBOT_BASE, TABLE_HEIGHT,
    WORKER_START, WORKPIECE_SIZE,
};
