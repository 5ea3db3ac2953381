//! Single-player Pong against a fallible AI.
//!
//! The player owns the left paddle and moves it with the encoder; the AI
//! owns the right one. Physics runs at a fixed 33 ms step regardless of
//! how often [`Pong::update`] is called.

use crate::app::ports::{DisplayPort, EntropyPort, TextAlign, TextSize};

pub const FIELD_WIDTH: i32 = 128;
pub const FIELD_HEIGHT: i32 = 64;

pub const PADDLE_WIDTH: i32 = 3;
pub const PADDLE_HEIGHT: i32 = 12;
pub const PADDLE_MARGIN: i32 = 4;
/// Pixels per encoder detent, and per AI step.
pub const PADDLE_SPEED: i32 = 3;

pub const BALL_SIZE: i32 = 3;
pub const BALL_SPEED_INITIAL: f32 = 1.5;
pub const BALL_SPEED_MAX: f32 = 3.5;
pub const BALL_SPEED_INCREMENT: f32 = 0.1;

pub const WINNING_SCORE: u8 = 5;
pub const STEP_MS: u32 = 33;

/// Percent of steps in which the AI moves at all.
pub const AI_REACTION_PCT: u32 = 70;
pub const AI_ERROR_PX: i32 = 4;

const PADDLE_TOP_MAX: i32 = FIELD_HEIGHT - PADDLE_HEIGHT;
const BALL_Y_MAX: f32 = (FIELD_HEIGHT - BALL_SIZE) as f32;
const AI_PADDLE_X: i32 = FIELD_WIDTH - PADDLE_MARGIN - PADDLE_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PongState {
    Ready,
    Playing,
    Paused,
    GameOver,
}

#[derive(Debug, Clone)]
pub struct Pong {
    state: PongState,
    ball_x: f32,
    ball_y: f32,
    vel_x: f32,
    vel_y: f32,
    speed: f32,
    player_y: i32,
    ai_y: i32,
    player_score: u8,
    ai_score: u8,
    last_step_ms: u32,
}

impl Pong {
    pub fn new() -> Self {
        let mut game = Self {
            state: PongState::Ready,
            ball_x: 0.0,
            ball_y: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            speed: BALL_SPEED_INITIAL,
            player_y: 0,
            ai_y: 0,
            player_score: 0,
            ai_score: 0,
            last_step_ms: 0,
        };
        game.reset(0);
        game
    }

    /// Back to the Ready screen with the score cleared.
    pub fn reset(&mut self, now_ms: u32) {
        self.state = PongState::Ready;
        self.player_score = 0;
        self.ai_score = 0;
        self.speed = BALL_SPEED_INITIAL;
        self.player_y = PADDLE_TOP_MAX / 2;
        self.ai_y = PADDLE_TOP_MAX / 2;
        self.center_ball();
        self.last_step_ms = now_ms;
    }

    /// Start from Ready or GameOver. No effect mid-game.
    pub fn start<R: EntropyPort + ?Sized>(&mut self, rng: &mut R, now_ms: u32) {
        if matches!(self.state, PongState::Ready | PongState::GameOver) {
            self.reset(now_ms);
            self.state = PongState::Playing;
            let toward_player = rng.random_range(0, 2) == 0;
            self.serve(toward_player, rng);
            log::info!("PONG: serve");
        }
    }

    pub fn toggle_pause(&mut self, now_ms: u32) {
        match self.state {
            PongState::Playing => self.state = PongState::Paused,
            PongState::Paused => {
                self.state = PongState::Playing;
                self.last_step_ms = now_ms;
            }
            _ => {}
        }
    }

    /// One click does whatever makes sense in the current state.
    pub fn on_click<R: EntropyPort + ?Sized>(&mut self, rng: &mut R, now_ms: u32) {
        match self.state {
            PongState::Ready | PongState::GameOver => self.start(rng, now_ms),
            PongState::Playing | PongState::Paused => self.toggle_pause(now_ms),
        }
    }

    /// Move the player paddle by encoder detents. Works in every state so
    /// the paddle can be lined up before serving.
    pub fn move_player(&mut self, detents: i32) {
        if detents != 0 {
            self.player_y = (self.player_y + detents * PADDLE_SPEED).clamp(0, PADDLE_TOP_MAX);
        }
    }

    /// Advance physics if a step is due. Returns `true` when something
    /// moved and the field needs redrawing.
    pub fn update<R: EntropyPort + ?Sized>(&mut self, rng: &mut R, now_ms: u32) -> bool {
        if self.state != PongState::Playing {
            return false;
        }
        if now_ms.wrapping_sub(self.last_step_ms) < STEP_MS {
            return false;
        }
        self.last_step_ms = now_ms;

        self.step_ai(rng);
        self.step_ball(rng);

        if self.player_score >= WINNING_SCORE || self.ai_score >= WINNING_SCORE {
            self.state = PongState::GameOver;
            log::info!("PONG: game over {}-{}", self.player_score, self.ai_score);
        }
        true
    }

    // ── Physics ───────────────────────────────────────────────

    fn center_ball(&mut self) {
        self.ball_x = (FIELD_WIDTH - BALL_SIZE) as f32 / 2.0;
        self.ball_y = (FIELD_HEIGHT - BALL_SIZE) as f32 / 2.0;
        self.vel_x = 0.0;
        self.vel_y = 0.0;
    }

    fn serve<R: EntropyPort + ?Sized>(&mut self, toward_player: bool, rng: &mut R) {
        self.speed = BALL_SPEED_INITIAL;
        // vertical slope in -0.25..0.25
        let angle = (rng.random_range(0, 100) as f32 - 50.0) / 100.0 * 0.5;
        self.vel_x = if toward_player { -self.speed } else { self.speed };
        self.vel_y = self.speed * angle;
    }

    fn step_ai<R: EntropyPort + ?Sized>(&mut self, rng: &mut R) {
        if self.vel_x <= 0.0 {
            return;
        }
        if rng.random_range(0, 100) >= AI_REACTION_PCT {
            return;
        }
        let error = rng.random_range(0, (2 * AI_ERROR_PX + 1) as u32) as i32 - AI_ERROR_PX;
        let target = self.predict_ball_y() + error;
        let center = self.ai_y + PADDLE_HEIGHT / 2;
        if target < center - 2 {
            self.ai_y -= PADDLE_SPEED;
        } else if target > center + 2 {
            self.ai_y += PADDLE_SPEED;
        }
        self.ai_y = self.ai_y.clamp(0, PADDLE_TOP_MAX);
    }

    /// Where the ball's center will cross the AI paddle's column,
    /// folding in up to ten wall bounces.
    pub fn predict_ball_y(&self) -> i32 {
        if self.vel_x <= 0.0 {
            return FIELD_HEIGHT / 2;
        }
        let time = (AI_PADDLE_X as f32 - self.ball_x) / self.vel_x;
        let mut y = self.ball_y + self.vel_y * time;
        for _ in 0..10 {
            if y < 0.0 {
                y = -y;
            } else if y > BALL_Y_MAX {
                y = 2.0 * BALL_Y_MAX - y;
            } else {
                break;
            }
        }
        (y + (BALL_SIZE / 2) as f32) as i32
    }

    fn step_ball<R: EntropyPort + ?Sized>(&mut self, rng: &mut R) {
        self.ball_x += self.vel_x;
        self.ball_y += self.vel_y;

        if self.ball_y <= 0.0 {
            self.ball_y = 0.0;
            self.vel_y = -self.vel_y;
        }
        if self.ball_y >= BALL_Y_MAX {
            self.ball_y = BALL_Y_MAX;
            self.vel_y = -self.vel_y;
        }

        if self.vel_x < 0.0 && self.hits_paddle(PADDLE_MARGIN, self.player_y) {
            self.bounce(self.player_y, true);
        }
        if self.vel_x > 0.0 && self.hits_paddle(AI_PADDLE_X, self.ai_y) {
            self.bounce(self.ai_y, false);
        }

        if self.ball_x < -(BALL_SIZE as f32) {
            self.ai_score += 1;
            self.center_ball();
            if self.ai_score < WINNING_SCORE {
                self.serve(true, rng);
            }
        } else if self.ball_x > FIELD_WIDTH as f32 {
            self.player_score += 1;
            self.center_ball();
            if self.player_score < WINNING_SCORE {
                self.serve(false, rng);
            }
        }
    }

    fn hits_paddle(&self, paddle_x: i32, paddle_y: i32) -> bool {
        let (px, py) = (paddle_x as f32, paddle_y as f32);
        let size = BALL_SIZE as f32;
        self.ball_x <= px + PADDLE_WIDTH as f32
            && self.ball_x + size >= px
            && self.ball_y + size >= py
            && self.ball_y <= py + PADDLE_HEIGHT as f32
    }

    /// Reflect off a paddle. The exit angle depends on where the ball
    /// struck; each hit speeds it up to the cap.
    fn bounce(&mut self, paddle_y: i32, from_player: bool) {
        let hit = (self.ball_y + BALL_SIZE as f32 / 2.0 - paddle_y as f32) / PADDLE_HEIGHT as f32;
        let hit = (hit * 2.0 - 1.0).clamp(-0.8, 0.8);
        self.speed = (self.speed + BALL_SPEED_INCREMENT).min(BALL_SPEED_MAX);
        self.vel_x = if from_player { self.speed } else { -self.speed };
        self.vel_y = self.speed * hit * 0.6;
        self.ball_x = if from_player {
            (PADDLE_MARGIN + PADDLE_WIDTH + 1) as f32
        } else {
            (AI_PADDLE_X - BALL_SIZE - 1) as f32
        };
    }

    // ── Rendering ─────────────────────────────────────────────

    pub fn draw<D: DisplayPort + ?Sized>(&self, d: &mut D) {
        d.clear();
        if self.state == PongState::Ready {
            d.draw_text("PONG", FIELD_WIDTH / 2, 6, TextSize::Large, TextAlign::Center);
            d.draw_text("Press to Start", FIELD_WIDTH / 2, 34, TextSize::Small, TextAlign::Center);
            d.draw_text("Long press: Exit", FIELD_WIDTH / 2, 48, TextSize::Small, TextAlign::Center);
            return;
        }

        for y in (0..FIELD_HEIGHT).step_by(8) {
            d.draw_line(FIELD_WIDTH / 2, y, FIELD_WIDTH / 2, y + 3);
        }
        d.draw_rect(PADDLE_MARGIN, self.player_y, PADDLE_WIDTH as u32, PADDLE_HEIGHT as u32, true);
        d.draw_rect(AI_PADDLE_X, self.ai_y, PADDLE_WIDTH as u32, PADDLE_HEIGHT as u32, true);
        d.draw_rect(self.ball_x as i32, self.ball_y as i32, BALL_SIZE as u32, BALL_SIZE as u32, true);

        let mut score: heapless::String<4> = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut score, format_args!("{}", self.player_score));
        d.draw_text(&score, FIELD_WIDTH / 2 - 10, 2, TextSize::Small, TextAlign::Right);
        score.clear();
        let _ = core::fmt::Write::write_fmt(&mut score, format_args!("{}", self.ai_score));
        d.draw_text(&score, FIELD_WIDTH / 2 + 10, 2, TextSize::Small, TextAlign::Left);

        match self.state {
            PongState::Paused => {
                d.draw_rect(24, 22, 80, 20, false);
                d.draw_text("PAUSED", FIELD_WIDTH / 2, 27, TextSize::Small, TextAlign::Center);
            }
            PongState::GameOver => {
                d.draw_rect(14, 18, 100, 28, false);
                let headline = if self.player_won() { "YOU WIN!" } else { "GAME OVER" };
                d.draw_text(headline, FIELD_WIDTH / 2, 21, TextSize::Small, TextAlign::Center);
                d.draw_text("Press to restart", FIELD_WIDTH / 2, 33, TextSize::Small, TextAlign::Center);
            }
            _ => {}
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> PongState {
        self.state
    }

    pub fn player_score(&self) -> u8 {
        self.player_score
    }

    pub fn ai_score(&self) -> u8 {
        self.ai_score
    }

    pub fn player_won(&self) -> bool {
        self.player_score >= WINNING_SCORE
    }

    pub fn player_y(&self) -> i32 {
        self.player_y
    }

    pub fn ball_speed(&self) -> f32 {
        self.speed
    }
}

impl Default for Pong {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always returns the low end of the range: serves go toward the
    /// player, the AI always reacts with maximum upward error.
    struct LowRng;

    impl EntropyPort for LowRng {
        fn random_range(&mut self, low: u32, _high: u32) -> u32 {
            low
        }
    }

    #[test]
    fn click_cycle() {
        let mut g = Pong::new();
        let mut rng = LowRng;
        assert_eq!(g.state(), PongState::Ready);
        g.on_click(&mut rng, 0);
        assert_eq!(g.state(), PongState::Playing);
        g.on_click(&mut rng, 10);
        assert_eq!(g.state(), PongState::Paused);
        assert!(!g.update(&mut rng, 1_000));
        g.on_click(&mut rng, 20);
        assert_eq!(g.state(), PongState::Playing);
    }

    #[test]
    fn paddle_is_clamped() {
        let mut g = Pong::new();
        g.move_player(-100);
        assert_eq!(g.player_y(), 0);
        g.move_player(100);
        assert_eq!(g.player_y(), FIELD_HEIGHT - PADDLE_HEIGHT);
    }

    #[test]
    fn fixed_step() {
        let mut g = Pong::new();
        let mut rng = LowRng;
        g.start(&mut rng, 0);
        assert!(!g.update(&mut rng, STEP_MS - 1));
        assert!(g.update(&mut rng, STEP_MS));
        assert!(!g.update(&mut rng, STEP_MS + 1));
    }

    #[test]
    fn missed_balls_end_the_game() {
        let mut g = Pong::new();
        let mut rng = LowRng;
        g.start(&mut rng, 0);
        // park the paddle away from the serve line so every ball is missed
        g.move_player(100);
        let mut now = 0;
        while g.state() == PongState::Playing && now < 600_000 {
            now += STEP_MS;
            g.update(&mut rng, now);
        }
        assert_eq!(g.state(), PongState::GameOver);
        assert_eq!(g.ai_score(), WINNING_SCORE);
        assert!(!g.player_won());

        g.on_click(&mut rng, now);
        assert_eq!(g.state(), PongState::Playing);
        assert_eq!(g.ai_score(), 0);
    }

    #[test]
    fn paddle_hit_speeds_up_ball() {
        let mut g = Pong::new();
        let mut rng = LowRng;
        g.start(&mut rng, 0);
        // the first serve reaches the left edge around y = 16
        g.move_player(-3);
        let mut now = 0;
        while g.ball_speed() == BALL_SPEED_INITIAL && now < 10_000 {
            now += STEP_MS;
            g.update(&mut rng, now);
        }
        assert!(g.ball_speed() > BALL_SPEED_INITIAL);
        assert!(g.ball_speed() <= BALL_SPEED_MAX);
    }

    #[test]
    fn prediction_folds_bounces() {
        let mut g = Pong::new();
        g.ball_x = 0.0;
        g.ball_y = 50.0;
        g.vel_x = 1.0;
        g.vel_y = 1.0;
        let y = g.predict_ball_y();
        assert!((0..FIELD_HEIGHT).contains(&y), "{y}");
    }
}
