//! 生成密码哈希
//!
//! 运行: cargo run -p catalog-admin-service --example gen_password_hash

use bcrypt::{hash, verify};

fn main() {
    let passwords = vec![("admin123", "admin"), ("operator123", "operator")];

    for (password, user) in passwords {
        match hash(password, 12) {
            Ok(h) => {
                println!("User: {} | Password: {} | Hash: {}", user, password, h);
                match verify(password, &h) {
                    Ok(true) => println!("  ✓ Verification passed"),
                    Ok(false) => println!("  ✗ Verification failed"),
                    Err(e) => println!("  ✗ Error: {}", e),
                }
            }
            Err(e) => eprintln!("Error hashing {}: {}", password, e),
        }
        println!();
    }
}
