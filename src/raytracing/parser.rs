use std::fmt;

use thiserror::Error;

use super::camera::Camera;
use super::core::{Light, Material, Scene, SceneObject, Solid};
use super::math::Vec3;

/// Single-pass tokenizer/parser for the scene description format:
///
/// ```text
/// size 640 480
/// camera from (0,0,-3) to (0,0,1) fov 90
/// material white                  # appended after the default at index 0
/// material lambert 0.8 (1,0.5,0)
/// sphere (0,0,4) 1 1              # center radius material-index
/// plane (0,1,0) -1 0              # normal distance material-index
/// light (0,5,3) white 25          # position color intensity
/// ```
pub struct SceneParser<'a> {
    content: &'a str,
    buffer: String,
    position: FilePosition,
}

#[derive(Debug, Clone, Copy)]
struct FilePosition {
    line: u32,
    column: u32,
    index: u32,
}

impl FilePosition {
    fn new() -> Self {
        FilePosition {
            line: 0,
            column: 0,
            index: 0,
        }
    }

    fn on_new_line(self: &mut Self) {
        self.line += 1;
        self.column = 0;
        self.index += 1;
    }

    fn advance(self: &mut Self) {
        self.column += 1;
        self.index += 1;
    }
}

impl fmt::Display for FilePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
#[error("{message} at {position}")]
pub struct ParserError {
    position: FilePosition,
    pub message: String,
}

impl ParserError {
    fn new(message: &str, position: FilePosition) -> ParserError {
        ParserError {
            position,
            message: message.to_string(),
        }
    }

    /// Print the offending line with a caret under the error column.
    pub fn print_error_location(self: &Self, content: &str) {
        println!("{}", self);
        if let Some(line) = content.lines().nth(self.position.line as usize) {
            println!("{}", line);
            let spacing = " ".repeat(self.position.column as usize);
            println!("{}^", spacing);
        }
    }
}

type ParserResult<T> = Result<T, ParserError>;

#[derive(Debug)]
pub struct ParsedScene {
    pub width: u32,
    pub height: u32,
    pub scene: Scene,
}

impl SceneParser<'_> {
    pub fn new<'a>(content: &'a str) -> SceneParser<'a> {
        SceneParser {
            content,
            position: FilePosition::new(),
            buffer: "".to_string(),
        }
    }

    fn get_current_char(self: &Self) -> Option<char> {
        self.content.chars().nth(self.position.index as usize)
    }

    fn is_empty(self: &Self) -> bool {
        self.get_current_char().is_none()
    }

    fn advance(self: &mut Self) -> bool {
        if let Some(current_char) = self.get_current_char() {
            if current_char == '\n' {
                self.position.on_new_line();
            } else {
                self.position.advance();
            }
            return true;
        }
        return false;
    }

    fn advance_until(self: &mut Self, f: impl Fn(char) -> bool) {
        while let Some(current_char) = self.get_current_char() {
            if f(current_char) {
                break;
            }
            self.advance();
        }
    }

    fn eat_spaces(self: &mut Self) {
        // consume all the empty lines, spaces and comments before the next token
        while let Some(current_char) = self.get_current_char() {
            if current_char == '#' {
                // consume until the end of the line; the end-of-line itself
                // is consumed at the bottom of the loop
                self.advance_until(|c| c == '\n');
            } else if !current_char.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn pop(self: &mut Self) -> String {
        // check if we already peeked without eating the next token
        if !self.buffer.is_empty() {
            let result = self.buffer.clone();
            self.buffer.clear();
            return result;
        }

        self.eat_spaces();
        let mut result = String::new();
        if self.is_empty() {
            return result;
        }
        let mut current_char = self.get_current_char().unwrap();
        // add the current char to the result string and advance
        let enqueue = move |parser: &mut SceneParser, result: &mut String| {
            if let Some(current_char) = parser.get_current_char() {
                result.push(current_char);
                parser.advance();
            }
            if let Some(next_char) = parser.get_current_char() {
                return next_char;
            }
            return ' ';
        };

        match current_char {
            // single-character symbols
            ',' | '(' | ')' => {
                self.advance();
                result.push(current_char);
            }
            // float parsing
            '.' | '+' | '-' | '0' | '1' | '2' | '3' | '4' | '5' | '6' | '7' | '8' | '9' => {
                if current_char == '+' || current_char == '-' {
                    current_char = enqueue(self, &mut result);
                }

                while current_char.is_digit(10) {
                    current_char = enqueue(self, &mut result);
                }

                if current_char == '.' {
                    current_char = enqueue(self, &mut result);
                    while current_char.is_digit(10) {
                        current_char = enqueue(self, &mut result);
                    }
                }
            }

            _ => {
                while current_char.is_alphabetic() {
                    current_char = enqueue(self, &mut result);
                }
            }
        }
        return result;
    }

    fn peek(self: &mut Self) -> &String {
        // peek always looks ahead and saves the result to the buffer
        if self.buffer.is_empty() {
            self.buffer = self.pop();
        }
        return &self.buffer;
    }

    fn error<T>(self: &mut Self, message: &str) -> ParserResult<T> {
        Err(ParserError::new(message, self.position))
    }

    fn parse_float(self: &mut Self) -> ParserResult<f64> {
        let next_token = self.pop();
        if let Ok(num) = next_token.parse::<f64>() {
            Ok(num)
        } else {
            let message = format!("cannot interpret '{}' as a float", next_token);
            self.error(&message)
        }
    }

    fn match_token(self: &mut Self, expected_lexem: &str) -> ParserResult<()> {
        let next_lexem = self.pop();
        if next_lexem != expected_lexem {
            let message = format!(
                "expected '{}', getting '{}' instead",
                expected_lexem, next_lexem
            );
            self.error(&message)
        } else {
            Ok(())
        }
    }

    fn maybe_match(self: &mut Self, expected_lexem: &str) -> bool {
        // variant of match that can fail: if the expected lexem is next in
        // the stream consume it and return true, otherwise leave the stream
        // untouched
        let next_lexem = self.peek();
        if *next_lexem == expected_lexem {
            self.pop();
            return true;
        }
        return false;
    }

    fn parse_header(self: &mut Self) -> ParserResult<(u32, u32)> {
        self.match_token("size")?;
        let width = self.parse_float()?;
        let height = self.parse_float()?;
        if width < 1.0 || height < 1.0 {
            return self.error("render target dimensions must be at least 1x1");
        }
        Ok((width as u32, height as u32))
    }

    fn parse_vec3(self: &mut Self) -> ParserResult<Vec3> {
        self.match_token("(")?;
        let x = self.parse_float()?;
        self.match_token(",")?;
        let y = self.parse_float()?;
        self.match_token(",")?;
        let z = self.parse_float()?;
        self.match_token(")")?;
        return Ok(Vec3::new(x, y, z));
    }

    fn parse_color(self: &mut Self) -> ParserResult<Vec3> {
        // predefined colors
        if self.maybe_match("red") {
            Ok(Vec3::new(1.0, 0.0, 0.0))
        } else if self.maybe_match("green") {
            Ok(Vec3::new(0.0, 1.0, 0.0))
        } else if self.maybe_match("blue") {
            Ok(Vec3::new(0.0, 0.0, 1.0))
        } else if self.maybe_match("white") {
            Ok(Vec3::one())
        } else if self.maybe_match("black") {
            Ok(Vec3::zero())
        } else if self.maybe_match("yellow") {
            Ok(Vec3::new(1.0, 1.0, 0.0))
        } else if self.maybe_match("cyan") {
            Ok(Vec3::new(0.0, 1.0, 1.0))
        } else if self.maybe_match("magenta") {
            Ok(Vec3::new(1.0, 0.0, 1.0))
        } else if self.maybe_match("gray") {
            Ok(Vec3::new(0.5, 0.5, 0.5))
        } else {
            self.parse_vec3()
        }
    }

    fn parse_camera(self: &mut Self) -> ParserResult<Camera> {
        let mut origin = Vec3::zero();
        let mut target = None;
        let mut fov_angle = 90.0;
        if self.maybe_match("camera") {
            if self.maybe_match("from") {
                origin = self.parse_vec3()?;
            }
            if self.maybe_match("to") {
                target = Some(self.parse_vec3()?);
            }
            if self.maybe_match("fov") {
                fov_angle = self.parse_float()?;
                if fov_angle <= 0.0 {
                    return self.error("field of view must be positive");
                }
            }
        }
        match target {
            Some(target) if target.distance(origin) < 1e-9 => {
                self.error("camera target coincides with its origin")
            }
            Some(target) => Ok(Camera::look_at(origin, target, fov_angle)),
            None => Ok(Camera::new(origin, fov_angle)),
        }
    }

    fn parse_material(self: &mut Self) -> ParserResult<Material> {
        self.match_token("material")?;
        if self.maybe_match("lambert") {
            let diffuse_reflectance = self.parse_float()?;
            let diffuse_color = self.parse_color()?;
            Ok(Material::Lambert {
                diffuse_reflectance,
                diffuse_color,
            })
        } else {
            let color = self.parse_color()?;
            Ok(Material::SolidColor { color })
        }
    }

    fn parse_material_index(self: &mut Self, material_count: usize) -> ParserResult<usize> {
        let index = self.parse_float()?;
        if index < 0.0 || index as usize >= material_count {
            let message = format!(
                "material index {} out of range, {} declared",
                index, material_count
            );
            return self.error(&message);
        }
        Ok(index as usize)
    }

    fn parse_sphere(self: &mut Self, material_count: usize) -> ParserResult<SceneObject> {
        self.match_token("sphere")?;
        let center = self.parse_vec3()?;
        let radius = self.parse_float()?;
        let material_index = self.parse_material_index(material_count)?;
        Ok(SceneObject {
            solid: Solid::Sphere { center, radius },
            material_index,
        })
    }

    fn parse_plane(self: &mut Self, material_count: usize) -> ParserResult<SceneObject> {
        self.match_token("plane")?;
        let normal = self.parse_vec3()?;
        let distance = self.parse_float()?;
        let material_index = self.parse_material_index(material_count)?;
        if normal.squared_len() < 1e-12 {
            return self.error("plane normal cannot be the zero vector");
        }
        Ok(SceneObject {
            solid: Solid::Plane {
                normal: normal.normalize(),
                distance,
            },
            material_index,
        })
    }

    fn parse_light(self: &mut Self) -> ParserResult<Light> {
        self.match_token("light")?;
        let position = self.parse_vec3()?;
        let color = self.parse_color()?;
        let intensity = self.parse_float()?;
        return Ok(Light {
            position,
            color,
            intensity,
        });
    }

    /// Main routine: parses the whole file into a renderable scene. The
    /// default background material is always installed at index 0, so the
    /// materials the renderer indexes are never empty.
    pub fn parse_scene(self: &mut Self) -> ParserResult<ParsedScene> {
        let (width, height) = self.parse_header()?;
        let camera = self.parse_camera()?;

        let mut scene = Scene::new(camera);
        scene.materials.push(Material::default_background());
        while !self.is_empty() {
            let next_token = self.peek();
            match next_token.as_str() {
                "material" => {
                    let material = self.parse_material()?;
                    scene.materials.push(material);
                }
                "sphere" => {
                    let object = self.parse_sphere(scene.materials.len())?;
                    scene.objects.push(object);
                }
                "plane" => {
                    let object = self.parse_plane(scene.materials.len())?;
                    scene.objects.push(object);
                }
                "light" => {
                    let light = self.parse_light()?;
                    scene.lights.push(light);
                }
                // the tokenizer yields an empty token both at end-of-input
                // and on a character it cannot start a token with; only the
                // former ends the parse
                "" => {
                    if self.is_empty() {
                        break;
                    }
                    let message = match self.get_current_char() {
                        Some(current_char) => {
                            format!("unexpected character '{}'", current_char)
                        }
                        None => "unexpected end of input".to_string(),
                    };
                    return self.error(&message);
                }
                _ => {
                    let message = format!("unexpected token '{}'", next_token);
                    return self.error(&message);
                }
            }
        }
        Ok(ParsedScene {
            width,
            height,
            scene,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "\
size 320 240
camera from (0,0,-3) to (0,0,1) fov 45
# a white sphere over a gray floor
material white
material lambert 0.8 gray
sphere (0,0,4) 1 1
plane (0,1,0) -1 2
light (0,5,3) white 25
";

    #[test]
    fn parses_a_complete_scene() {
        let mut parser = SceneParser::new(EXAMPLE);
        let parsed = parser.parse_scene().unwrap();
        assert_eq!(parsed.width, 320);
        assert_eq!(parsed.height, 240);
        // default material plus the two declared ones
        assert_eq!(parsed.scene.materials.len(), 3);
        assert_eq!(parsed.scene.objects.len(), 2);
        assert_eq!(parsed.scene.lights.len(), 1);
        assert!((parsed.scene.camera.fov_angle - 45.0).abs() < 1e-9);
    }

    #[test]
    fn camera_defaults_apply_when_the_block_is_absent() {
        let mut parser = SceneParser::new("size 8 8\nmaterial red\nsphere (0,0,4) 1 1");
        let parsed = parser.parse_scene().unwrap();
        assert_eq!(parsed.scene.camera.origin, Vec3::zero());
        assert!((parsed.scene.camera.fov_angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn missing_size_header_is_an_error() {
        let mut parser = SceneParser::new("camera from (0,0,0)");
        let error = parser.parse_scene().unwrap_err();
        assert!(error.message.contains("expected 'size'"));
    }

    #[test]
    fn out_of_range_material_index_is_rejected() {
        let mut parser = SceneParser::new("size 8 8\nsphere (0,0,4) 1 3");
        let error = parser.parse_scene().unwrap_err();
        assert!(error.message.contains("out of range"));
    }

    #[test]
    fn zero_sized_target_is_rejected_up_front() {
        let mut parser = SceneParser::new("size 0 240");
        assert!(parser.parse_scene().is_err());
    }

    #[test]
    fn errors_carry_a_line_and_column() {
        let mut parser = SceneParser::new("size 320 240\nblob (0,0,0)");
        let error = parser.parse_scene().unwrap_err();
        let rendered = error.to_string();
        assert!(rendered.contains("unexpected token 'blob'"));
        assert!(rendered.contains("at 1:"));
    }

    #[test]
    fn comments_and_named_colors_are_understood() {
        let source = "size 4 4 # tiny\nmaterial magenta # background-ish\nlight (1,1,1) yellow 10";
        let mut parser = SceneParser::new(source);
        let parsed = parser.parse_scene().unwrap();
        assert_eq!(parsed.scene.lights[0].color, Vec3::new(1.0, 1.0, 0.0));
        assert!((parsed.scene.lights[0].intensity - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unrecognized_characters_are_reported_not_skipped() {
        // a token-start character outside the grammar must surface as a
        // positional error, not silently end the parse with a partial scene
        let source = "size 8 8\n$phere (0,0,4) 1 1\nlight (0,5,3) white 25";
        let mut parser = SceneParser::new(source);
        let error = parser.parse_scene().unwrap_err();
        assert!(error.message.contains("unexpected character '$'"));
        assert!(error.to_string().contains("at 1:0"));
    }

    #[test]
    fn trailing_whitespace_and_comments_still_end_the_parse_cleanly() {
        let mut parser = SceneParser::new("size 8 8\nmaterial red\n# done\n  \n");
        let parsed = parser.parse_scene().unwrap();
        assert_eq!(parsed.scene.materials.len(), 2);
    }

    #[test]
    fn degenerate_camera_target_is_rejected() {
        let mut parser = SceneParser::new("size 8 8\ncamera from (1,2,3) to (1,2,3)");
        let error = parser.parse_scene().unwrap_err();
        assert!(error.message.contains("coincides"));
    }
}
