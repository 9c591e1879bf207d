use crate::{
    anno_log::AnnotationLog,
    canvas::{CanvasSession, EditCommand, Flow, PointerEvent},
    cfg::LoadFailurePolicy,
    error::{Error, Result},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Non-recursive listing of the images in `dir`, sorted by file name.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let to_err = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_err)? {
        let path = entry.map_err(to_err)?.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn next(idx: usize, len: usize) -> usize {
    (idx + 1) % len
}

fn prev(idx: usize, len: usize) -> usize {
    (idx + len - 1) % len
}

/// The image list seen as a ring. Never empty.
#[derive(Clone, Debug)]
pub struct ImageRing {
    files: Vec<PathBuf>,
    idx: usize,
}

impl ImageRing {
    pub fn new(files: Vec<PathBuf>) -> Option<Self> {
        if files.is_empty() {
            None
        } else {
            Some(Self { files, idx: 0 })
        }
    }

    pub fn next(&mut self) {
        self.idx = next(self.idx, self.files.len());
    }

    pub fn prev(&mut self) {
        self.idx = prev(self.idx, self.files.len());
    }

    fn step(&mut self, dir: Direction) {
        match dir {
            Direction::Forward => self.next(),
            Direction::Backward => self.prev(),
        }
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn current(&self) -> &Path {
        &self.files[self.idx]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavCommand {
    Next,
    Previous,
    Exit,
    /// Any other key at the prompt opens the current image again.
    Reopen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit,
}

pub enum Phase {
    Editing(CanvasSession),
    /// Between two sessions, waiting for a [`NavCommand`].
    Choosing,
}

/// Drives one canvas session per image and moves around the image ring.
pub struct Navigator {
    ring: ImageRing,
    log: AnnotationLog,
    policy: LoadFailurePolicy,
    phase: Phase,
    session_id: u64,
}

impl Navigator {
    /// Opens the first image of the ring.
    pub fn start(ring: ImageRing, log: AnnotationLog, policy: LoadFailurePolicy) -> Result<Self> {
        let mut nav = Self {
            ring,
            log,
            policy,
            phase: Phase::Choosing,
            session_id: 0,
        };
        nav.open_current(Direction::Forward)?;
        Ok(nav)
    }

    fn open_current(&mut self, dir: Direction) -> Result<()> {
        let mut attempts = 0;
        loop {
            match CanvasSession::open(self.ring.current()) {
                Ok(session) => {
                    self.phase = Phase::Editing(session);
                    self.session_id += 1;
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    if self.policy == LoadFailurePolicy::Abort || attempts >= self.ring.len() {
                        return Err(e);
                    }
                    warn!("skipping unreadable image: {e}");
                    self.ring.step(dir);
                }
            }
        }
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        if let Phase::Editing(session) = &mut self.phase {
            session.pointer(event);
        }
    }

    pub fn edit(&mut self, cmd: EditCommand) -> Result<()> {
        if let Phase::Editing(session) = &mut self.phase {
            if session.command(cmd, &self.log)? == Flow::Quit {
                self.phase = Phase::Choosing;
                info!("press 'n' for next image, 'p' for previous image, or 'ESC' to exit");
            }
        }
        Ok(())
    }

    /// Ignored while a session is open.
    pub fn navigate(&mut self, cmd: NavCommand) -> Result<Step> {
        if let Phase::Editing(_) = self.phase {
            return Ok(Step::Continue);
        }
        let dir = match cmd {
            NavCommand::Next => {
                self.ring.next();
                Direction::Forward
            }
            NavCommand::Previous => {
                self.ring.prev();
                Direction::Backward
            }
            NavCommand::Reopen => Direction::Forward,
            NavCommand::Exit => {
                info!("exiting program");
                return Ok(Step::Exit);
            }
        };
        self.open_current(dir)?;
        Ok(Step::Continue)
    }

    /// Changes whenever a session is opened, including a reopen of the same image.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn session(&self) -> Option<&CanvasSession> {
        match &self.phase {
            Phase::Editing(session) => Some(session),
            Phase::Choosing => None,
        }
    }

    pub fn ring(&self) -> &ImageRing {
        &self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anno_log::DEFAULT_LOG_FILE,
        store::Point,
        test_helpers::{init_tracing_for_tests, write_test_image},
    };
    use std::fs;
    use tempfile::TempDir;

    fn ab_folder() -> (TempDir, AnnotationLog) {
        init_tracing_for_tests();
        let dir = tempfile::tempdir().unwrap();
        write_test_image(dir.path(), "a.png", 20, 20);
        write_test_image(dir.path(), "b.jpg", 20, 20);
        let log = AnnotationLog::new(dir.path().join(DEFAULT_LOG_FILE));
        (dir, log)
    }

    fn start(dir: &Path, log: AnnotationLog, policy: LoadFailurePolicy) -> Result<Navigator> {
        let ring = ImageRing::new(discover_images(dir).unwrap()).unwrap();
        Navigator::start(ring, log, policy)
    }

    fn gesture(nav: &mut Navigator, coords: &[(i32, i32)]) {
        let (first, rest) = coords.split_first().unwrap();
        let (last, middle) = rest.split_last().unwrap();
        nav.pointer(PointerEvent::Down(Point::new(first.0, first.1)));
        for &(x, y) in middle {
            nav.pointer(PointerEvent::Move(Point::new(x, y)));
        }
        nav.pointer(PointerEvent::Up(Point::new(last.0, last.1)));
    }

    fn current_name(nav: &Navigator) -> String {
        nav.session()
            .unwrap()
            .image_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_prev_next() {
        assert_eq!(next(0, 4), 1);
        assert_eq!(next(3, 4), 0);
        assert_eq!(prev(0, 4), 3);
        assert_eq!(prev(2, 4), 1);
        assert_eq!(next(0, 1), 0);
        assert_eq!(prev(0, 1), 0);
    }

    #[test]
    fn test_ring_wraps() {
        let files: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("{i}.png"))).collect();
        let mut ring = ImageRing::new(files).unwrap();
        for _ in 0..5 {
            ring.next();
        }
        assert_eq!(ring.idx(), 0);
        ring.prev();
        assert_eq!(ring.idx(), 4);
        assert_eq!(ring.current(), Path::new("4.png"));
        assert!(ImageRing::new(vec![]).is_none());
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.JPEG", "a.png", "B.Jpg", "notes.txt", "d.gif", "noext"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.png")).unwrap();
        fs::write(dir.path().join("sub.png").join("inner.png"), b"").unwrap();
        let names: Vec<String> = discover_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["B.Jpg", "a.png", "c.JPEG"]);
    }

    #[test]
    fn test_discover_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_images(dir.path()).unwrap().is_empty());
        assert!(matches!(
            discover_images(&dir.path().join("missing")),
            Err(Error::ReadDir { .. })
        ));
    }

    #[test]
    fn test_save_on_first_image_only() {
        let (dir, log) = ab_folder();
        let mut nav = start(dir.path(), log.clone(), LoadFailurePolicy::Abort).unwrap();
        assert_eq!(current_name(&nav), "a.png");
        gesture(&mut nav, &[(1, 1), (5, 1), (3, 4)]);
        nav.edit(EditCommand::Save).unwrap();
        nav.edit(EditCommand::Quit).unwrap();
        assert!(nav.session().is_none());
        assert_eq!(nav.navigate(NavCommand::Next).unwrap(), Step::Continue);
        assert_eq!(current_name(&nav), "b.jpg");
        assert!(nav.session().unwrap().annotations().is_empty());
        nav.edit(EditCommand::Quit).unwrap();
        assert_eq!(nav.navigate(NavCommand::Exit).unwrap(), Step::Exit);

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "Image: a.png\n[(1, 1), (5, 1), (3, 4)]\n\n");
    }

    #[test]
    fn test_two_contours_saved_in_drawing_order() {
        let (dir, log) = ab_folder();
        let mut nav = start(dir.path(), log.clone(), LoadFailurePolicy::Abort).unwrap();
        gesture(&mut nav, &[(0, 0), (2, 2)]);
        gesture(&mut nav, &[(9, 9), (8, 7), (6, 5)]);
        nav.edit(EditCommand::Save).unwrap();
        let content = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "Image: a.png",
                "[(0, 0), (2, 2)]",
                "[(9, 9), (8, 7), (6, 5)]",
                ""
            ]
        );
    }

    #[test]
    fn test_clear_then_save_writes_empty_block() {
        let (dir, log) = ab_folder();
        let mut nav = start(dir.path(), log.clone(), LoadFailurePolicy::Abort).unwrap();
        gesture(&mut nav, &[(0, 0), (2, 2), (4, 0)]);
        nav.edit(EditCommand::Clear).unwrap();
        nav.edit(EditCommand::Save).unwrap();
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "Image: a.png\n\n");
    }

    #[test]
    fn test_previous_wraps_and_reopen_resets() {
        let (dir, log) = ab_folder();
        let mut nav = start(dir.path(), log, LoadFailurePolicy::Abort).unwrap();
        // navigation keys do nothing while editing
        assert_eq!(nav.navigate(NavCommand::Next).unwrap(), Step::Continue);
        assert_eq!(nav.ring().idx(), 0);

        nav.edit(EditCommand::Quit).unwrap();
        nav.navigate(NavCommand::Previous).unwrap();
        assert_eq!(current_name(&nav), "b.jpg");

        gesture(&mut nav, &[(1, 1), (2, 2)]);
        nav.edit(EditCommand::Quit).unwrap();
        let id_before = nav.session_id();
        nav.navigate(NavCommand::Reopen).unwrap();
        assert_eq!(current_name(&nav), "b.jpg");
        assert_eq!(nav.session_id(), id_before + 1);
        assert!(nav.session().unwrap().annotations().is_empty());

        // pointer events between sessions go nowhere
        nav.edit(EditCommand::Quit).unwrap();
        nav.pointer(PointerEvent::Down(Point::new(1, 1)));
        assert!(nav.session().is_none());
    }

    #[test]
    fn test_unreadable_image_aborts() {
        let (dir, log) = ab_folder();
        fs::write(dir.path().join("c.png"), b"garbage").unwrap();
        let mut nav = start(dir.path(), log, LoadFailurePolicy::Abort).unwrap();
        nav.edit(EditCommand::Quit).unwrap();
        let res = nav.navigate(NavCommand::Previous);
        assert!(matches!(res, Err(Error::ImageLoad { .. })));
    }

    #[test]
    fn test_unreadable_image_skipped() {
        let (dir, log) = ab_folder();
        fs::write(dir.path().join("c.png"), b"garbage").unwrap();
        let mut nav = start(dir.path(), log, LoadFailurePolicy::Skip).unwrap();
        nav.edit(EditCommand::Quit).unwrap();
        // a -> c (broken) -> b when going backwards
        nav.navigate(NavCommand::Previous).unwrap();
        assert_eq!(current_name(&nav), "b.jpg");
        nav.edit(EditCommand::Quit).unwrap();
        // b -> c (broken) -> a when going forwards
        nav.navigate(NavCommand::Next).unwrap();
        assert_eq!(current_name(&nav), "a.png");
    }

    #[test]
    fn test_all_unreadable_fails_even_when_skipping() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.png"), b"garbage").unwrap();
        fs::write(dir.path().join("y.jpg"), b"garbage").unwrap();
        let log = AnnotationLog::new(dir.path().join(DEFAULT_LOG_FILE));
        assert!(matches!(
            start(dir.path(), log, LoadFailurePolicy::Skip),
            Err(Error::ImageLoad { .. })
        ));
    }
}
