mod catch_all;
mod faulty;
mod scene;

pub use catch_all::CatchAllHandler;
pub use faulty::FaultyStore;
pub use scene::TestScene;
