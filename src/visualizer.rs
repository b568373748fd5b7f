//! 2D visualization.
//!
//! The occupancy field is shown as a texture with the cells traced by the sensor rays overlaid.
//! The robot is drawn as a rectangle rotated by its heading and every sensed obstacle point as a
//! red circle.

use bevy::{
    prelude::*,
    render::{
        render_asset::RenderAssetUsages,
        render_resource::{Extent3d, TextureDimension, TextureFormat},
        texture::ImageSampler,
    },
};

use crate::{
    domain::{Maneuver, OccupancyField, OccupancyGrid, Position, TraceOverlay},
    resource::{FieldRes, OverlayRes, PointCloudRes, RobotRes, StartRes},
    simulator::SimulationStep,
};

const FREE: [u8; 4] = [255, 255, 255, 255];
const OCCUPIED: [u8; 4] = [0, 0, 0, 255];
const TRACED: [u8; 4] = [0, 208, 255, 255];

const OBSTACLE_MARKER_RADIUS: f32 = 3.0;

pub struct Visualizer;

impl Plugin for Visualizer {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, set_up)
            .add_systems(
                Update,
                (
                    handle_keyboard_input.before(SimulationStep),
                    (update_map, draw_robot, draw_point_cloud, update_text).after(SimulationStep),
                ),
            )
            .init_resource::<Scene>();
    }
}

#[derive(Resource, Default)]
pub struct Scene {
    map: Handle<Image>,
    show_text: bool,
}

fn set_up(
    mut scene: ResMut<Scene>,
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    field: Res<FieldRes>,
    overlay: Res<OverlayRes>,
) {
    commands.spawn(Camera2dBundle::default());

    scene.map = images.add(create_map_image(&field, &overlay));
    commands.spawn(SpriteBundle {
        texture: scene.map.clone(),
        ..default()
    });

    scene.show_text = true;
    create_text(&mut commands);
}

fn create_map_image(field: &OccupancyGrid, overlay: &TraceOverlay) -> Image {
    let mut data = vec![0; field.width() * field.height() * 4];
    paint_map(&mut data, field, overlay);

    let mut image = Image::new(
        Extent3d {
            width: field.width() as u32,
            height: field.height() as u32,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    image.sampler = ImageSampler::nearest();
    image
}

fn paint_map(data: &mut [u8], field: &OccupancyGrid, overlay: &TraceOverlay) {
    for (idx, pixel) in data.chunks_exact_mut(4).enumerate() {
        let x = (idx % field.width()) as i64;
        let y = (idx / field.width()) as i64;
        let color = if overlay.is_marked(x, y) {
            TRACED
        } else if field.is_occupied(x, y) {
            OCCUPIED
        } else {
            FREE
        };
        pixel.copy_from_slice(&color);
    }
}

fn create_text(commands: &mut Commands) {
    let text_style = TextStyle {
        font_size: 20.0,
        color: Color::BLACK,
        ..default()
    };
    commands.spawn(
        TextBundle::from_sections(vec![TextSection::new("", text_style.clone())]).with_style(
            Style {
                position_type: PositionType::Absolute,
                bottom: Val::Px(12.0),
                left: Val::Px(12.0),
                ..default()
            },
        ),
    );
}

fn update_map(
    scene: Res<Scene>,
    mut images: ResMut<Assets<Image>>,
    field: Res<FieldRes>,
    overlay: Res<OverlayRes>,
) {
    if !overlay.is_changed() {
        return;
    }

    if let Some(image) = images.get_mut(&scene.map) {
        paint_map(&mut image.data, &field, &overlay);
    }
}

fn draw_robot(mut gizmos: Gizmos, robot: Res<RobotRes>, field: Res<FieldRes>) {
    let center = to_bevy_position(robot.position(), &**field);
    let heading: f32 = robot.heading().into();
    let size = robot.config().axle_width as f32;

    gizmos.rect_2d(center, heading, Vec2::new(1.2 * size, size), Color::BLUE);
    gizmos.line_2d(
        center,
        center + Vec2::from_angle(heading) * size,
        Color::GREEN,
    );
}

fn draw_point_cloud(mut gizmos: Gizmos, point_cloud: Res<PointCloudRes>, field: Res<FieldRes>) {
    for point in point_cloud.iter() {
        gizmos.circle_2d(
            to_bevy_position(point.position(), &**field),
            OBSTACLE_MARKER_RADIUS,
            Color::RED,
        );
    }
}

fn update_text(mut text: Query<&mut Text>, scene: Res<Scene>, robot: Res<RobotRes>) {
    let mut text = text.single_mut();
    if scene.show_text {
        let pos = robot.position();
        let heading = robot.heading().to_deg();
        let wheels = robot.wheel_speeds();
        let vel_left = robot.config().to_meters(wheels.left);
        let vel_right = robot.config().to_meters(wheels.right);
        let state = robot.avoidance_state();
        let maneuver = match state.maneuver() {
            Maneuver::Cruise => "CRUISE",
            Maneuver::Reverse => "REVERSE",
        };
        text.sections[0].value = format!(
            "POS: {:4.0} {:4.0} {heading:3.0} deg   VEL: {vel_left:5.3} m/s {vel_right:5.3} m/s   \
             {maneuver} {:3.1} s",
            pos.x(),
            pos.y(),
            state.countdown()
        );
    } else {
        text.sections[0].value = String::new();
    }
}

fn handle_keyboard_input(
    keys: Res<ButtonInput<KeyCode>>,
    mut scene: ResMut<Scene>,
    mut robot: ResMut<RobotRes>,
    start: Res<StartRes>,
    mut time: ResMut<Time<Virtual>>,
) {
    if keys.just_pressed(KeyCode::KeyR) {
        robot.reset(**start);
    }

    if keys.just_pressed(KeyCode::KeyT) {
        scene.show_text = !scene.show_text;
    }

    if keys.just_pressed(KeyCode::Space) {
        if time.is_paused() {
            time.unpause();
        } else {
            time.pause();
        }
    }
}

/// The field's origin is its top-left corner with y pointing down, Bevy's is the window center
/// with y pointing up.
fn to_bevy_position(position: Position, field: &impl OccupancyField) -> Vec2 {
    Vec2::new(
        (position.x() - field.width() as f64 / 2.0) as f32,
        (field.height() as f64 / 2.0 - position.y()) as f32,
    )
}
