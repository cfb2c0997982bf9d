//! Earlier names of the grid accessors.
//!
//! Each shim logs one deprecation notice per call and forwards to the
//! current accessor. Nothing inside the crate calls these.

use tracing::warn;

use crate::error::CouplingResult;

use super::wrapper::ModelAdapter;

fn notice(old: &str, new: &str) {
    warn!(target: "confluence::deprecated", old, new, "{} is deprecated, use {}", old, new);
}

impl ModelAdapter {
    #[deprecated(note = "use `grid_ndim`")]
    pub fn get_grid_rank(&self, grid: i32) -> CouplingResult<usize> {
        notice("get_grid_rank", "grid_ndim");
        self.grid_ndim(grid)
    }

    #[deprecated(note = "use `grid_number_of_nodes`")]
    pub fn get_grid_size(&self, grid: i32) -> CouplingResult<usize> {
        notice("get_grid_size", "grid_number_of_nodes");
        self.grid_number_of_nodes(grid)
    }

    #[deprecated(note = "use `grid_number_of_vertices`")]
    pub fn get_grid_vertex_count(&self, grid: i32) -> CouplingResult<usize> {
        notice("get_grid_vertex_count", "grid_number_of_vertices");
        self.grid_number_of_vertices(grid)
    }

    #[deprecated(note = "use `grid_number_of_faces`")]
    pub fn get_grid_face_count(&self, grid: i32) -> CouplingResult<usize> {
        notice("get_grid_face_count", "grid_number_of_faces");
        self.grid_number_of_faces(grid)
    }

    #[deprecated(note = "use `face_node_connectivity`")]
    pub fn get_grid_connectivity(&self, grid: i32) -> CouplingResult<Vec<usize>> {
        notice("get_grid_connectivity", "face_node_connectivity");
        self.face_node_connectivity(grid)
    }

    #[deprecated(note = "use `face_node_offset`")]
    pub fn get_grid_offset(&self, grid: i32) -> CouplingResult<Vec<usize>> {
        notice("get_grid_offset", "face_node_offset");
        self.face_node_offset(grid)
    }
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use crate::adapter::ModelAdapter;
    use crate::model::TriangleMeshModel;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn mesh() -> ModelAdapter {
        let mut adapter = ModelAdapter::new(TriangleMeshModel::new());
        adapter.initialize(None, std::env::temp_dir()).unwrap();
        adapter
    }

    fn with_capture<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, captured.text())
    }

    #[test]
    fn test_shims_delegate_to_current_names() {
        let adapter = mesh();
        assert_eq!(adapter.get_grid_rank(0).unwrap(), adapter.grid_ndim(0).unwrap());
        assert_eq!(adapter.get_grid_size(0).unwrap(), 4);
        assert_eq!(adapter.get_grid_face_count(0).unwrap(), 2);
        assert_eq!(adapter.get_grid_vertex_count(0).unwrap(), 6);
        assert_eq!(adapter.get_grid_connectivity(0).unwrap(), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(adapter.get_grid_offset(0).unwrap(), vec![3, 6]);
    }

    #[test]
    fn test_one_notice_per_call() {
        let adapter = mesh();
        let (_, log) = with_capture(|| {
            adapter.get_grid_connectivity(0).unwrap();
            adapter.get_grid_connectivity(0).unwrap();
            adapter.get_grid_vertex_count(0).unwrap();
        });
        assert_eq!(log.matches("get_grid_connectivity is deprecated").count(), 2);
        assert_eq!(log.matches("get_grid_vertex_count is deprecated").count(), 1);
        assert_eq!(log.matches("is deprecated").count(), 3);
    }

    #[test]
    fn test_current_names_are_silent() {
        let adapter = mesh();
        let (_, log) = with_capture(|| {
            adapter.face_node_connectivity(0).unwrap();
            adapter.grid_number_of_vertices(0).unwrap();
        });
        assert!(log.is_empty(), "unexpected output: {}", log);
    }
}
