//! Touch screen calibration.
//!
//! Resistive touch panels report raw ADC coordinates that relate to
//! screen coordinates by an affine transform that varies per unit. The
//! [`calibrate`](calibrate) routine here shows three targets, collects a
//! raw touch for each, solves for the transform, and loads it into the
//! chip's transform registers.

use crate::commands::coprocessor::{Coprocessor, Error as CoproError, FaultMessage};
use crate::commands::options::OPT_CENTER;
use crate::commands::waiter::Waiter;
use crate::display_list::{DLCmd, Primitive};
use crate::interface::Interface;
use crate::registers::Register;
use crate::screen::ScreenShape;

/// The touch register's "no touch" flag.
const NO_TOUCH: u32 = 0x8000_0000;

const TRANSFORM_REGISTERS: [Register; 6] = [
    Register::TOUCH_TRANSFORM_A,
    Register::TOUCH_TRANSFORM_B,
    Register::TOUCH_TRANSFORM_C,
    Register::TOUCH_TRANSFORM_D,
    Register::TOUCH_TRANSFORM_E,
    Register::TOUCH_TRANSFORM_F,
];

/// An affine transform from raw touch coordinates to screen
/// coordinates, in the chip's 16.16 fixed-point representation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TouchTransform {
    pub coef: [i32; 6],
}

impl TouchTransform {
    /// Applies the transform to a raw touch coordinate, as the chip
    /// itself would.
    pub fn apply(&self, tx: i32, ty: i32) -> (i32, i32) {
        let c = &self.coef;
        let x = (c[0] as i64 * tx as i64 + c[1] as i64 * ty as i64 + c[2] as i64) >> 16;
        let y = (c[3] as i64 * tx as i64 + c[4] as i64 * ty as i64 + c[5] as i64) >> 16;
        (x as i32, y as i32)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Error<E> {
    /// A FIFO or interface failure while drawing the target screens.
    Coprocessor(CoproError<E>),
    /// The coprocessor faulted while drawing a target screen.
    Fault(FaultMessage),
    /// The three recorded touches were collinear, so no affine
    /// transform can be derived from them. Usually this means the user
    /// tapped the same spot repeatedly.
    Collinear,
    /// The user never tapped a target.
    TouchTimeout,
}

// FaultMessage deliberately has no PartialEq, so we only compare the
// variants that tests construct directly.
impl<E: PartialEq> PartialEq for Error<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Coprocessor(a), Error::Coprocessor(b)) => a == b,
            (Error::Fault(_), Error::Fault(_)) => true,
            (Error::Collinear, Error::Collinear) => true,
            (Error::TouchTimeout, Error::TouchTimeout) => true,
            _ => false,
        }
    }
}

impl<E> From<CoproError<E>> for Error<E> {
    fn from(e: CoproError<E>) -> Self {
        Error::Coprocessor(e)
    }
}

/// Runs the interactive three-point calibration sequence.
///
/// For each of three targets this draws a marker, waits for the user to
/// tap and release it, and records the raw coordinates of the tap. The
/// solved transform is written to the transform registers and also
/// returned, so the application can persist it and restore it on later
/// boots without recalibrating.
///
/// `touch_poll_limit` bounds how many times the touch register is
/// polled per target before giving up on the user.
pub fn calibrate<I: Interface, W: Waiter<I>>(
    cp: &mut Coprocessor<I, W>,
    shape: &ScreenShape,
    touch_poll_limit: u32,
) -> Result<TouchTransform, Error<I::Error>> {
    let targets = target_points(shape);
    let mut touches: [(i32, i32); 3] = [(0, 0); 3];

    for (i, target) in targets.iter().enumerate() {
        draw_target_screen(cp, shape, *target, i)?;
        if let Some(msg) = cp.drain()? {
            return Err(Error::Fault(msg));
        }
        // Let the screen settle so the user is not tapping a target
        // that is about to move.
        cp.low_level()
            .borrow_interface()
            .delay_ms(300)
            .map_err(|e| Error::Coprocessor(CoproError::Interface(e)))?;
        touches[i] = wait_for_touch(cp, touch_poll_limit)?;
    }

    let transform = solve(&targets, &touches)?;
    write_transform(cp, &transform).map_err(Error::Coprocessor)?;
    Ok(transform)
}

/// Writes a previously-derived transform to the transform registers,
/// e.g. one persisted from an earlier [`calibrate`](calibrate) run.
pub fn write_transform<I: Interface, W: Waiter<I>>(
    cp: &mut Coprocessor<I, W>,
    transform: &TouchTransform,
) -> Result<(), CoproError<I::Error>> {
    for (reg, coef) in TRANSFORM_REGISTERS.iter().zip(transform.coef.iter()) {
        cp.low_level()
            .wr32r(*reg, *coef as u32)
            .map_err(CoproError::Interface)?;
    }
    Ok(())
}

fn target_points(shape: &ScreenShape) -> [(i32, i32); 3] {
    let w = shape.width as i32;
    let h = shape.height as i32;
    let ho = shape.h_offset as i32;
    let vo = shape.v_offset as i32;
    [
        (w * 15 / 100 + ho, h * 15 / 100 + vo),
        (w * 85 / 100 + ho, h / 2 + vo),
        (w / 2 + ho, h * 85 / 100 + vo),
    ]
}

fn draw_target_screen<I: Interface, W: Waiter<I>>(
    cp: &mut Coprocessor<I, W>,
    shape: &ScreenShape,
    target: (i32, i32),
    index: usize,
) -> Result<(), CoproError<I::Error>> {
    let (x, y) = target;
    let cx = (shape.width / 2) as i16;
    let cy = (shape.height / 2) as i16;

    cp.start_display_list()?;
    cp.submit_words(&[
        DLCmd::clear_color_rgb(64, 64, 64).to_raw(),
        DLCmd::clear_all().to_raw(),
        DLCmd::color_rgb(255, 0, 0).to_raw(),
        DLCmd::point_size(20 * 16).to_raw(),
        DLCmd::begin(Primitive::Points).to_raw(),
        DLCmd::vertex2f(x * 16, y * 16).to_raw(),
        DLCmd::end().to_raw(),
        DLCmd::color_rgb(255, 255, 255).to_raw(),
    ])?;
    cp.cmd_text(cx, cy - 20, 27, OPT_CENTER, "Calibrating")?;
    cp.cmd_text(cx, cy + 20, 26, OPT_CENTER, "Please tap the dots")?;
    let digit = match index {
        0 => "1",
        1 => "2",
        _ => "3",
    };
    cp.cmd_text(x as i16, y as i16, 27, OPT_CENTER, digit)?;
    cp.append_display_list(DLCmd::display())?;
    cp.display_list_swap()
}

fn wait_for_touch<I: Interface, W: Waiter<I>>(
    cp: &mut Coprocessor<I, W>,
    poll_limit: u32,
) -> Result<(i32, i32), Error<I::Error>> {
    let ll = cp.low_level();
    let mut touch: Option<(i32, i32)> = None;
    for _ in 0..poll_limit {
        let v = ll
            .rd32r(Register::TOUCH_DIRECT_XY)
            .map_err(|e| Error::Coprocessor(CoproError::Interface(e)))?;
        match (touch, v & NO_TOUCH) {
            (None, 0) => {
                // Raw coordinates are 10 bits each.
                let tx = ((v >> 16) & 0x3ff) as i32;
                let ty = (v & 0x3ff) as i32;
                touch = Some((tx, ty));
            }
            // Wait for release so the next target doesn't immediately
            // pick up the same press.
            (Some(t), flag) if flag != 0 => return Ok(t),
            _ => {}
        }
    }
    Err(Error::TouchTimeout)
}

/// Solves for the transform mapping the given raw touches onto the
/// given screen targets, by Cramer's rule.
fn solve<E>(
    display: &[(i32, i32); 3],
    touch: &[(i32, i32); 3],
) -> Result<TouchTransform, Error<E>> {
    let (dx, dy): ([i64; 3], [i64; 3]) = (
        [display[0].0 as i64, display[1].0 as i64, display[2].0 as i64],
        [display[0].1 as i64, display[1].1 as i64, display[2].1 as i64],
    );
    let (tx, ty): ([i64; 3], [i64; 3]) = (
        [touch[0].0 as i64, touch[1].0 as i64, touch[2].0 as i64],
        [touch[0].1 as i64, touch[1].1 as i64, touch[2].1 as i64],
    );

    let k = (tx[0] - tx[2]) * (ty[1] - ty[2]) - (tx[1] - tx[2]) * (ty[0] - ty[2]);
    if k == 0 {
        return Err(Error::Collinear);
    }

    let a = (dx[0] - dx[2]) * (ty[1] - ty[2]) - (dx[1] - dx[2]) * (ty[0] - ty[2]);
    let b = (tx[0] - tx[2]) * (dx[1] - dx[2]) - (dx[0] - dx[2]) * (tx[1] - tx[2]);
    let c = ty[0] * (tx[2] * dx[1] - tx[1] * dx[2])
        + ty[1] * (tx[0] * dx[2] - tx[2] * dx[0])
        + ty[2] * (tx[1] * dx[0] - tx[0] * dx[1]);
    let d = (dy[0] - dy[2]) * (ty[1] - ty[2]) - (dy[1] - dy[2]) * (ty[0] - ty[2]);
    let e = (tx[0] - tx[2]) * (dy[1] - dy[2]) - (dy[0] - dy[2]) * (tx[1] - tx[2]);
    let f = ty[0] * (tx[2] * dy[1] - tx[1] * dy[2])
        + ty[1] * (tx[0] * dy[2] - tx[2] * dy[0])
        + ty[2] * (tx[1] * dy[0] - tx[0] * dy[1]);

    Ok(TouchTransform {
        coef: [
            calc_coef(a, k),
            calc_coef(b, k),
            calc_coef(c, k),
            calc_coef(d, k),
            calc_coef(e, k),
            calc_coef(f, k),
        ],
    })
}

/// Converts the exact ratio `q / k` to the chip's 16.16 fixed-point
/// representation.
///
/// The fraction is computed in a 14-bit intermediate and shifted up,
/// which loses the bottom two bits of precision but keeps every
/// intermediate comfortably inside 64 bits even for the large
/// determinant products that feed it.
///
/// Quotients whose integer part does not fit the 16.16 range saturate
/// to the extreme representable coefficient; the transform registers
/// are 32 bits wide, so there is nothing better to send for them.
fn calc_coef(q: i64, k: i64) -> i32 {
    let neg = (q < 0) != (k < 0);
    let q = q.abs() as u64;
    let k = k.abs() as u64;
    if q / k >= 1 << 15 {
        return if neg { i32::MIN } else { i32::MAX };
    }
    let integer = (q / k) << 16;
    let frac = (((q % k) << 14) / k) << 2;
    let r = (integer | frac) as i64;
    (if neg { -r } else { r }) as i32
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::commands::PollingWaiter;
    use crate::interface::fake::Fake;

    #[test]
    fn test_calc_coef_matches_wide_division() {
        // Quotients here all stay inside the 16.16 range; saturation of
        // larger ones is covered separately.
        let cases: [(i64, i64); 8] = [
            (0, 5),
            (1, 1),
            (1, 3),
            (-7, 3),
            (7, -3),
            (123_456_789, 1_013_000),
            (-987_654_321, 777_000),
            (480 * 1000, 1024),
        ];
        for (q, k) in cases.iter() {
            let got = calc_coef(*q, *k) as i64;
            let want = ((*q as i128) << 16) / (*k as i128);
            let diff = (got as i128 - want).abs();
            assert!(
                diff <= 4,
                "calc_coef({}, {}) = {} but wide division gives {}",
                q,
                k,
                got,
                want
            );
        }
    }

    #[test]
    fn test_calc_coef_saturates_out_of_range() {
        // Largest in-range integer part is 32767.
        assert_eq!(calc_coef(32767, 1), 0x7fff0000);
        assert_eq!(calc_coef(32768, 1), i32::MAX);
        assert_eq!(calc_coef(-32768, 1), i32::MIN);
        assert_eq!(calc_coef(123_456_789, 1013), i32::MAX);
        assert_eq!(calc_coef(-123_456_789, 1013), i32::MIN);
        assert_eq!(calc_coef(987_654_321, -777), i32::MIN);
    }

    #[test]
    fn test_calc_coef_sign_symmetry() {
        assert_eq!(calc_coef(-7, 3), -calc_coef(7, 3));
        assert_eq!(calc_coef(7, -3), -calc_coef(7, 3));
        assert_eq!(calc_coef(-7, -3), calc_coef(7, 3));
        assert_eq!(calc_coef(0, 48048), 0);
    }

    #[test]
    fn test_solve_identity() {
        let pts = [(72, 40), (408, 136), (240, 231)];
        let t = solve::<()>(&pts, &pts).unwrap();
        assert_eq!(t.coef, [0x10000, 0, 0, 0, 0x10000, 0]);
    }

    #[test]
    fn test_solve_scale_and_offset() {
        // Screen = touch / 2 + 10 on both axes.
        let touch = [(100, 200), (600, 300), (400, 800)];
        let display = [(60, 110), (310, 160), (210, 410)];
        let t = solve::<()>(&display, &touch).unwrap();
        let (x, y) = t.apply(500, 640);
        assert_eq!((x, y), (260, 330));
    }

    #[test]
    fn test_solve_pure_scale() {
        let display = [(10, 10), (90, 50), (50, 90)];
        let touch = [(100, 100), (900, 500), (500, 900)];
        let t = solve::<()>(&display, &touch).unwrap();
        for (d, raw) in display.iter().zip(touch.iter()) {
            let (x, y) = t.apply(raw.0, raw.1);
            assert!(
                (x - d.0).abs() <= 1 && (y - d.1).abs() <= 1,
                "touch {:?} mapped to ({}, {}) but wanted {:?}",
                raw,
                x,
                y,
                d
            );
        }
    }

    #[test]
    fn test_solve_collinear() {
        let display = [(72, 40), (408, 136), (240, 231)];
        let touch = [(0, 0), (100, 100), (200, 200)];
        assert_eq!(solve::<()>(&display, &touch), Err(Error::Collinear));
    }

    #[test]
    fn test_calibrate_with_scripted_touches() {
        const NT: u32 = 0x8000_0000;
        let touch = |x: u32, y: u32| (x << 16) | y;

        let mut fake = Fake::new();
        // The user taps each target dead-on and releases between taps.
        fake.script_touch(&[
            NT,
            touch(72, 40),
            NT,
            touch(408, 136),
            NT,
            touch(240, 231),
            NT,
        ]);

        let mut cp = Coprocessor::new(fake, PollingWaiter::new(100)).unwrap();
        let shape = ScreenShape::new(480, 272);
        let t = calibrate(&mut cp, &shape, 100).unwrap();
        assert_eq!(t.coef, [0x10000, 0, 0, 0, 0x10000, 0]);

        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.reg32(0x150), 0x10000);
        assert_eq!(fake.reg32(0x154), 0);
        assert_eq!(fake.reg32(0x158), 0);
        assert_eq!(fake.reg32(0x15c), 0);
        assert_eq!(fake.reg32(0x160), 0x10000);
        assert_eq!(fake.reg32(0x164), 0);
        // Each target screen gets a settle delay.
        assert!(fake.total_delay_ms() >= 900);
    }

    #[test]
    fn test_calibrate_touch_timeout() {
        let mut fake = Fake::new();
        fake.script_touch(&[0x8000_0000]);
        let mut cp = Coprocessor::new(fake, PollingWaiter::new(100)).unwrap();
        let shape = ScreenShape::new(480, 272);
        assert_eq!(
            calibrate(&mut cp, &shape, 10),
            Err(Error::TouchTimeout)
        );
    }
}
